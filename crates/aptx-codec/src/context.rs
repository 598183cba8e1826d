//! 编解码上下文.
//!
//! `AptxContext` 持有一条流的全部状态: 左右声道、奇偶帧计数、
//! 编码冲洗与解码延迟计数、自动重同步的字节缓存. 所有操作原地修改
//! 上下文; 字节级驱动见 `stream` 模块.

use crate::channel::Channel;
use crate::{LATENCY_SAMPLES, NB_CHANNELS, NB_SUBBANDS};

pub(crate) const LEFT: usize = 0;
pub(crate) const RIGHT: usize = 1;

/// 每次奇偶不符时按此顺序在声道内扫描子带, 取量化误差最小者换用备选值
const SYNC_SUBBAND_ORDER: [usize; NB_SUBBANDS] = [1, 2, 0, 3];

/// aptX / aptX HD 编解码上下文
///
/// 一个上下文只服务一条流; 编码与解码共用同一类型, 方向由调用的操作决定.
/// 跨流复用前调用 [`reset`](Self::reset).
pub struct AptxContext {
    pub(crate) channels: [Channel; NB_CHANNELS],
    pub(crate) hd: bool,
    /// 奇偶帧计数, 每 8 帧强制一次奇偶为 1 的同步帧
    pub(crate) sync_idx: u8,
    /// 冲洗阶段剩余的零填充帧数
    pub(crate) encode_remaining: u8,
    /// 解码起始需丢弃的延迟帧数
    pub(crate) decode_skip_leading: u8,
    /// 自动重同步的跨调用字节缓存 (至多 sample_size - 1 字节有效)
    pub(crate) decode_sync_buffer: [u8; 6],
    pub(crate) decode_sync_buffer_len: usize,
    /// 重同步期间累计丢弃的字节数
    pub(crate) decode_dropped: usize,
    /// 确认窗口内连续解码成功的码字数
    pub(crate) decode_sync_packets: usize,
}

impl Default for AptxContext {
    fn default() -> Self {
        Self {
            channels: Default::default(),
            hd: false,
            sync_idx: 0,
            encode_remaining: LATENCY_SAMPLES.div_ceil(4) as u8,
            decode_skip_leading: LATENCY_SAMPLES.div_ceil(4) as u8,
            decode_sync_buffer: [0; 6],
            decode_sync_buffer_len: 0,
            decode_dropped: 0,
            decode_sync_packets: 0,
        }
    }
}

impl AptxContext {
    /// 创建指定变体的上下文: `hd = false` 为 aptX, `true` 为 aptX HD
    pub fn new(hd: bool) -> Self {
        Self {
            hd,
            ..Default::default()
        }
    }

    /// 复位全部流状态 (仅保留变体选择), 用于切换到新的流
    pub fn reset(&mut self) {
        *self = Self {
            hd: self.hd,
            ..Default::default()
        };
    }

    /// 复位编解码状态但保留重同步进度, 供自动重同步在丢字节后重试
    pub(crate) fn reset_decode_sync(&mut self) {
        let decode_sync_buffer = self.decode_sync_buffer;
        let decode_sync_buffer_len = self.decode_sync_buffer_len;
        let decode_dropped = self.decode_dropped;
        let decode_sync_packets = self.decode_sync_packets;

        self.reset();

        self.decode_sync_buffer = decode_sync_buffer;
        self.decode_sync_buffer_len = decode_sync_buffer_len;
        self.decode_dropped = decode_dropped;
        self.decode_sync_packets = decode_sync_packets;
    }

    /// 是否为 aptX HD 变体
    pub fn is_hd(&self) -> bool {
        self.hd
    }

    /// 每帧码字的字节数: aptX 为 4, aptX HD 为 6
    pub fn sample_size(&self) -> usize {
        if self.hd { 6 } else { 4 }
    }

    /// 推进奇偶帧计数并校验双声道奇偶, 返回 true 表示不符.
    ///
    /// 要求: 除每第 8 帧须为 1 外, 双声道奇偶异或恒为 0.
    pub(crate) fn check_parity(&mut self) -> bool {
        let parity =
            self.channels[LEFT].quantized_parity() ^ self.channels[RIGHT].quantized_parity();
        let eighth = i32::from(self.sync_idx == 7);
        self.sync_idx = (self.sync_idx + 1) & 7;
        (parity ^ eighth) != 0
    }

    /// 编码端奇偶插入: 不符时把量化误差最小的子带换成其备选量化值.
    ///
    /// 扫描顺序为声道 {RIGHT, LEFT}、子带 {1, 2, 0, 3}, 严格小于比较,
    /// 误差相同时先被扫描到的子带胜出.
    pub(crate) fn insert_sync(&mut self) {
        if self.check_parity() {
            let mut min_channel = NB_CHANNELS - 1;
            let mut min_subband = SYNC_SUBBAND_ORDER[0];
            for ch in (0..NB_CHANNELS).rev() {
                for &subband in SYNC_SUBBAND_ORDER.iter() {
                    if self.channels[ch].quantize[subband].error
                        < self.channels[min_channel].quantize[min_subband].error
                    {
                        min_channel = ch;
                        min_subband = subband;
                    }
                }
            }
            let quantize = &mut self.channels[min_channel].quantize[min_subband];
            quantize.quantized_sample = quantize.quantized_sample_parity_change;
        }
    }

    /// 编码一帧 (每声道 4 个 PCM 采样), 输出一对码字到 `output`
    pub(crate) fn encode_samples(
        &mut self,
        samples: &[[i32; 4]; NB_CHANNELS],
        output: &mut [u8],
    ) {
        let hd = self.hd;
        for (channel, channel_samples) in self.channels.iter_mut().zip(samples.iter()) {
            channel.encode_channel(channel_samples, hd);
        }

        self.insert_sync();

        for (ch, channel) in self.channels.iter_mut().enumerate() {
            channel.invert_quantize_and_prediction(hd);
            if hd {
                let codeword = channel.pack_codeword_hd();
                output[3 * ch] = (codeword >> 16) as u8;
                output[3 * ch + 1] = (codeword >> 8) as u8;
                output[3 * ch + 2] = codeword as u8;
            } else {
                let codeword = channel.pack_codeword();
                output[2 * ch] = (codeword >> 8) as u8;
                output[2 * ch + 1] = codeword as u8;
            }
        }
    }

    /// 解码一帧码字对, 返回各声道 4 个 PCM 采样与奇偶校验结果.
    ///
    /// 校验失败时本帧合成输出无意义, 由调用方停止推进来表达失败.
    pub(crate) fn decode_samples(
        &mut self,
        input: &[u8],
    ) -> ([[i32; 4]; NB_CHANNELS], bool) {
        let hd = self.hd;
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            channel.generate_dither();

            if hd {
                let codeword = (u32::from(input[3 * ch]) << 16)
                    | (u32::from(input[3 * ch + 1]) << 8)
                    | u32::from(input[3 * ch + 2]);
                channel.unpack_codeword_hd(codeword);
            } else {
                let codeword = (u16::from(input[2 * ch]) << 8) | u16::from(input[2 * ch + 1]);
                channel.unpack_codeword(codeword);
            }
            channel.invert_quantize_and_prediction(hd);
        }

        let ok = !self.check_parity();

        let mut samples = [[0i32; 4]; NB_CHANNELS];
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            samples[ch] = channel.decode_channel();
        }
        (samples, ok)
    }
}
