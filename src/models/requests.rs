//! 对外请求模型

use serde::{Deserialize, Serialize};

/// 查询单个学号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRequest {
    /// 成绩查询首页地址，或站点路径（如 `JJEcbcs25`）
    pub index_url: String,
    pub usn: String,
}

/// 查询学号范围 `[start_usn, end_usn]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRequest {
    pub index_url: String,
    pub start_usn: String,
    pub end_usn: String,
}
