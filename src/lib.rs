//! # aptx
//!
//! 纯 Rust 实现的 aptX / aptX HD 音频编解码器工具集.
//!
//! aptX 与 aptX HD 是一对近亲的子带 ADPCM 编码格式, 常用于低延迟
//! 无线音频传输, 分别提供 6:1 与 4:1 的固定压缩比 (24 位立体声 PCM).
//! 本实现与参考码流逐位一致.
//!
//! # 快速开始
//!
//! ```rust
//! use aptx::codec::AptxContext;
//!
//! // hd = true 选择 aptX HD 变体
//! let mut ctx = AptxContext::new(true);
//! let pcm = [0u8; 24 * 4];
//! let mut stream = [0u8; 6 * 4];
//! let (consumed, written) = ctx.encode(&pcm, &mut stream);
//! assert_eq!((consumed, written), (pcm.len(), stream.len()));
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `aptx-core` | 错误类型与定点整数工具 |
//! | `aptx-codec` | 编解码核心与流式驱动 |

/// 错误类型与定点整数工具 (对标 libavutil)
pub use aptx_core as core;

/// 编解码核心与流式驱动 (对标 libavcodec)
pub use aptx_codec as codec;

/// 获取库版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
