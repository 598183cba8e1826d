//! 两级 QMF (正交镜像滤波器) 树.
//!
//! 分析方向: 4 个 PCM 采样经外层半带分解为 2 个中间子带, 再经内层
//! 分解为 4 个子带采样 (LF, MLF, MHF, HF), 整体降采样 4 倍.
//! 合成方向为严格逆过程, 复用同一组信号缓冲.
//!
//! 每条支路是 16 抽头多相 FIR, 两组系数互为镜像. 卷积以 i64 累加后
//! 按级右移 (分析 23, 内层合成 22, 外层合成 21) 并裁剪到 24 位.

use aptx_core::intmath::{clip_intp2, rshift64_clip24};

use crate::{FILTER_TAPS, NB_FILTERS, NB_SUBBANDS};

/// 外层 QMF 卷积系数, 两组互为镜像
static QMF_OUTER_COEFFS: [[i32; FILTER_TAPS]; NB_FILTERS] = [
    [
        730, -413, -9611, 43626, -121026, 269973, -585547, 2801966,
        697128, -160481, 27611, 8478, -10043, 3511, 688, -897,
    ],
    [
        -897, 688, 3511, -10043, 8478, 27611, -160481, 697128,
        2801966, -585547, 269973, -121026, 43626, -9611, -413, 730,
    ],
];

/// 内层 QMF 卷积系数, 两组互为镜像
static QMF_INNER_COEFFS: [[i32; FILTER_TAPS]; NB_FILTERS] = [
    [
        1033, -584, -13592, 61697, -171156, 381799, -828088, 3962579,
        985888, -226954, 39048, 11990, -14203, 4966, 973, -1268,
    ],
    [
        -1268, 973, 4966, -14203, 11990, 39048, -226954, 985888,
        3962579, -828088, 381799, -171156, 61697, -13592, -584, 1033,
    ],
];

/// 一条 FIR 支路的信号历史.
///
/// 缓冲按双份存储 (`buffer[i] == buffer[i + FILTER_TAPS]`), 卷积因此
/// 总能从 `pos` 起连续读 16 个采样而无需回绕运算.
#[derive(Clone, Default)]
pub(crate) struct FilterSignal {
    buffer: [i32; 2 * FILTER_TAPS],
    pos: usize,
}

impl FilterSignal {
    /// 向环形缓冲推入一个采样, 同步写入两份副本
    fn push(&mut self, sample: i32) {
        self.buffer[self.pos] = sample;
        self.buffer[self.pos + FILTER_TAPS] = sample;
        self.pos = (self.pos + 1) & (FILTER_TAPS - 1);
    }

    /// 信号与系数卷积, 结果右移 `shift` 位并裁剪到 24 位
    fn convolution(&self, coeffs: &[i32; FILTER_TAPS], shift: u32) -> i32 {
        let signal = &self.buffer[self.pos..self.pos + FILTER_TAPS];
        let mut e: i64 = 0;
        for (s, c) in signal.iter().zip(coeffs.iter()) {
            e += i64::from(*s) * i64::from(*c);
        }
        rshift64_clip24(e, shift)
    }
}

/// 半带 QMF 分析: 2 个输入采样分解为 (低, 高) 子带各 1 个采样
fn polyphase_analysis(
    signal: &mut [FilterSignal; NB_FILTERS],
    coeffs: &[[i32; FILTER_TAPS]; NB_FILTERS],
    shift: u32,
    samples: [i32; NB_FILTERS],
) -> (i32, i32) {
    let mut subbands = [0i32; NB_FILTERS];
    for i in 0..NB_FILTERS {
        signal[i].push(samples[NB_FILTERS - 1 - i]);
        subbands[i] = signal[i].convolution(&coeffs[i], shift);
    }
    (
        clip_intp2(subbands[0] + subbands[1], 23),
        clip_intp2(subbands[0] - subbands[1], 23),
    )
}

/// 半带 QMF 合成: (低, 高) 子带各 1 个采样合成为 2 个输出采样
fn polyphase_synthesis(
    signal: &mut [FilterSignal; NB_FILTERS],
    coeffs: &[[i32; FILTER_TAPS]; NB_FILTERS],
    shift: u32,
    low: i32,
    high: i32,
) -> [i32; NB_FILTERS] {
    let subbands = [low + high, low - high];
    let mut samples = [0i32; NB_FILTERS];
    for i in 0..NB_FILTERS {
        signal[i].push(subbands[1 - i]);
        samples[i] = signal[i].convolution(&coeffs[i], shift);
    }
    samples
}

/// 两级 QMF 树的全部信号状态
#[derive(Clone, Default)]
pub(crate) struct QmfAnalysis {
    outer_filter_signal: [FilterSignal; NB_FILTERS],
    inner_filter_signal: [[FilterSignal; NB_FILTERS]; NB_FILTERS],
}

impl QmfAnalysis {
    /// 分析树: 4 个 PCM 采样 -> 4 个子带采样 (LF, MLF, MHF, HF)
    pub(crate) fn tree_analysis(
        &mut self,
        samples: &[i32; 4],
        subband_samples: &mut [i32; NB_SUBBANDS],
    ) {
        let mut intermediate = [0i32; 4];

        // 外层: 4 个输入采样分解为 2 个中间子带各 2 个采样
        for i in 0..2 {
            let (low, high) = polyphase_analysis(
                &mut self.outer_filter_signal,
                &QMF_OUTER_COEFFS,
                23,
                [samples[2 * i], samples[2 * i + 1]],
            );
            intermediate[i] = low;
            intermediate[2 + i] = high;
        }

        // 内层: 2 个中间子带各自再分解, 得到 4 个子带采样
        for i in 0..2 {
            let (low, high) = polyphase_analysis(
                &mut self.inner_filter_signal[i],
                &QMF_INNER_COEFFS,
                23,
                [intermediate[2 * i], intermediate[2 * i + 1]],
            );
            subband_samples[2 * i] = low;
            subband_samples[2 * i + 1] = high;
        }
    }

    /// 合成树: 4 个子带采样 -> 4 个 PCM 采样, 为分析树的严格逆过程
    pub(crate) fn tree_synthesis(
        &mut self,
        subband_samples: &[i32; NB_SUBBANDS],
        samples: &mut [i32; 4],
    ) {
        let mut intermediate = [0i32; 4];

        for i in 0..2 {
            let pair = polyphase_synthesis(
                &mut self.inner_filter_signal[i],
                &QMF_INNER_COEFFS,
                22,
                subband_samples[2 * i],
                subband_samples[2 * i + 1],
            );
            intermediate[2 * i] = pair[0];
            intermediate[2 * i + 1] = pair[1];
        }

        for i in 0..2 {
            let pair = polyphase_synthesis(
                &mut self.outer_filter_signal,
                &QMF_OUTER_COEFFS,
                21,
                intermediate[i],
                intermediate[2 + i],
            );
            samples[2 * i] = pair[0];
            samples[2 * i + 1] = pair[1];
        }
    }
}
