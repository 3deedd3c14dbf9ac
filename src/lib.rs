//! 窥屏检测服务
//!
//! 持续分析摄像头画面，判断是否有第二个人在注视主用户的屏幕，
//! 并在该行为持续达到配置时长后发出告警。
//!
//! ## 模块
//! - `detector`: 单帧分析（主用户识别、视线分类、帧结论）
//! - `monitor`: 告警状态机与后台监控循环
//! - `capture`: 采集设备与关键点提供者的抽象，以及录制回放后端
//! - `routes`: HTTP 控制面（启停、状态、告警事件流）

pub mod capture;
pub mod config;
pub mod constants;
pub mod detector;
pub mod logging;
pub mod middleware;
pub mod monitor;
pub mod response;
pub mod routes;
pub mod state;
