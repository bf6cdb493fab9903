//! 学号（USN）及其范围枚举
//!
//! 学号由字母数字前缀和定宽的十进制计数器组成，例如 `1AB21CS001`
//! 的前缀是 `1AB21CS`，计数器为 `001`（宽度 3）。纯数字学号（如 `"7"`）
//! 视为没有前缀的计数器。

use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Result, ScrapeError};

/// 计数器最多 18 位，保证不会溢出 u64
const MAX_COUNTER_WIDTH: usize = 18;

/// 学号
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    prefix: String,
    counter: u64,
    width: usize,
}

impl Identifier {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// 下一个学号；计数器位数溢出时返回 `None`
    pub fn successor(&self) -> Option<Identifier> {
        let next = self.counter.checked_add(1)?;
        if next.to_string().len() > self.width {
            return None;
        }
        Some(Identifier {
            prefix: self.prefix.clone(),
            counter: next,
            width: self.width,
        })
    }

    /// 前缀和计数器宽度相同的学号才可以比较
    fn same_series(&self, other: &Identifier) -> bool {
        self.prefix == other.prefix && self.width == other.width
    }
}

impl FromStr for Identifier {
    type Err = ScrapeError;

    fn from_str(raw: &str) -> Result<Self> {
        let usn = raw.trim().to_ascii_uppercase();

        if usn.is_empty() {
            return Err(ScrapeError::InvalidIdentifier("学号不能为空".to_string()));
        }
        if !usn.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ScrapeError::InvalidIdentifier(format!(
                "学号只能包含字母和数字: {}",
                raw
            )));
        }

        let digits = usn.chars().rev().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return Err(ScrapeError::InvalidIdentifier(format!(
                "学号必须以数字结尾: {}",
                raw
            )));
        }

        // 超长的数字串只把最后 18 位当作计数器
        let width = digits.min(MAX_COUNTER_WIDTH);
        let split = usn.len() - width;
        let counter = usn[split..]
            .parse::<u64>()
            .map_err(|e| ScrapeError::InvalidIdentifier(format!("学号计数器无效 {}: {}", raw, e)))?;

        Ok(Identifier {
            prefix: usn[..split].to_string(),
            counter,
            width,
        })
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:0width$}", self.prefix, self.counter, width = self.width)
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.same_series(other) {
            Some(self.counter.cmp(&other.counter))
        } else {
            None
        }
    }
}

/// `[start, end]` 闭区间内的学号，按计数器顺序枚举
#[derive(Debug, Clone)]
pub struct IdentifierRange {
    next: Option<Identifier>,
    end: Identifier,
}

impl IdentifierRange {
    /// 校验并创建范围：前缀和宽度必须一致，且 `start <= end`
    pub fn new(start: Identifier, end: Identifier) -> Result<Self> {
        match start.partial_cmp(&end) {
            None => Err(ScrapeError::InvalidRange(format!(
                "起止学号格式不一致: {} .. {}",
                start, end
            ))),
            Some(Ordering::Greater) => Err(ScrapeError::InvalidRange(format!(
                "起始学号 {} 大于结束学号 {}",
                start, end
            ))),
            Some(_) => Ok(Self {
                next: Some(start),
                end,
            }),
        }
    }

    /// 从字符串解析范围；任一端学号无效都视为范围无效
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let endpoint = |raw: &str, label: &str| {
            raw.parse::<Identifier>().map_err(|e| match e {
                ScrapeError::InvalidIdentifier(reason) => {
                    ScrapeError::InvalidRange(format!("{}: {}", label, reason))
                }
                other => other,
            })
        };
        Self::new(endpoint(start, "起始学号")?, endpoint(end, "结束学号")?)
    }

    /// 范围内学号总数
    ///
    /// 18 位计数器的范围可能超过 `usize`，调用方应先用它做上限检查再分配内存。
    pub fn count_remaining(&self) -> u64 {
        match &self.next {
            Some(next) => self.end.counter - next.counter + 1,
            None => 0,
        }
    }
}

impl Iterator for IdentifierRange {
    type Item = Identifier;

    fn next(&mut self) -> Option<Identifier> {
        let current = self.next.take()?;
        if current.counter < self.end.counter {
            self.next = current.successor();
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.count_remaining()) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}
