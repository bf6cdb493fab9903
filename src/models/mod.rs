pub mod attempt;
pub mod captcha;
pub mod identifier;
pub mod requests;
pub mod result;

pub use attempt::{AttemptOutcome, AttemptRecord};
pub use captcha::{CaptchaImage, Challenge, CleanedImage, FormToken, RawResponse};
pub use identifier::{Identifier, IdentifierRange};
pub use requests::{RangeRequest, SingleRequest};
pub use result::{RangeResult, RangeStats, ScrapeOutcome, ScrapeResult, ScrapeStatus};
