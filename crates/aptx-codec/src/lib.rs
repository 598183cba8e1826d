//! # aptx-codec
//!
//! 纯 Rust 实现的 aptX / aptX HD 音频编解码器, 与参考码流逐位一致.
//!
//! 两种变体都工作在 24 位有符号立体声 PCM 上, 压缩比固定:
//! aptX 6:1 (每帧 4 字节), aptX HD 4:1 (每帧 6 字节).
//!
//! ## 处理管线
//!
//! - 两级 QMF 分析/合成树 (4 采样 <-> 4 子带)
//! - 码字历史驱动的抖动发生器
//! - 各子带后向自适应差分量化 / 逆量化
//! - 符号相关权重预测器 (阶数 24/12/6/12)
//! - 跨声道奇偶插入, 每 8 帧一个同步标记
//! - 字节级流式驱动, 含丢字节自动重同步
//!
//! ## 使用示例
//!
//! ```rust
//! use aptx_codec::AptxContext;
//!
//! let mut ctx = AptxContext::new(false);
//! let pcm = [0u8; 24 * 4]; // 4 帧静音, 24 位小端立体声交织
//! let mut stream = [0u8; 4 * 4];
//! let (consumed, written) = ctx.encode(&pcm, &mut stream);
//! assert_eq!((consumed, written), (pcm.len(), stream.len()));
//! // 复位状态下编码静音得到固定前缀, 可用于流类型识别
//! assert_eq!(&stream[..4], &[0x4b, 0xbf, 0x4b, 0xbf]);
//! ```

mod channel;
mod context;
mod prediction;
mod qmf;
mod quantize;
mod stream;
mod tables;

pub use context::AptxContext;
pub use stream::DecodeSyncStatus;

/// 库版本号 (主)
pub const VERSION_MAJOR: i32 = 0;
/// 库版本号 (次)
pub const VERSION_MINOR: i32 = 2;
/// 库版本号 (修订)
pub const VERSION_PATCH: i32 = 0;

/// 声道数, 固定立体声
pub const NB_CHANNELS: usize = 2;
/// 每声道子带数 (LF, MLF, MHF, HF)
pub const NB_SUBBANDS: usize = 4;
/// QMF 每级的多相支路数
pub(crate) const NB_FILTERS: usize = 2;
/// 每条 FIR 支路的抽头数
pub(crate) const FILTER_TAPS: usize = 16;
/// 两级 QMF 树的端到端延迟 (采样数); 编码端冲洗 92 个采样 (23 帧),
/// 解码端丢弃开头 90 个输出采样
pub const LATENCY_SAMPLES: usize = 90;
