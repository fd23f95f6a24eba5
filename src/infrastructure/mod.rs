//! 基础设施层
//!
//! 持有稀缺资源（浏览器页面），只暴露能力。

pub mod driver;
pub mod js_executor;
pub mod scripts;

pub use driver::{
    BrowserConnector, BrowserLink, Candidate, ControlShape, FieldQuery, FieldSnapshot, PageDriver,
    PageHandle, SubmitClick,
};
pub use js_executor::JsExecutor;
