//! 统一错误类型定义.
//!
//! 编解码核心的流控 (输出缓冲写满、校验失败) 通过返回值表达, 不经过错误类型;
//! 这里的错误类型服务于命令行工具的 I/O 路径与参数校验.

use thiserror::Error;

/// aptX 工具链统一错误类型
#[derive(Debug, Error)]
pub enum AptxError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// aptX 工具链统一 Result 类型
pub type AptxResult<T> = Result<T, AptxError>;
