//! 子带差分量化器.
//!
//! 对 `子带采样 - 预测值` 的差分做抖动辅助量化: 区间表二分定位、
//! 抖动扰动、误差估计. 除量化结果外还要给出翻转奇偶所需的备选值
//! 与量化误差幅度, 供跨声道奇偶插入 (`insert_sync`) 挑选代价最小的
//! 子带.

use aptx_core::intmath::{clip_intp2, rshift32_clip24, rshift64, rshift64_clip24};

use crate::tables::Tables;

/// 区间表二分检索: 取满足 `factor * intervals[idx] <= value << 24` 的最大下标
fn bin_search(value: i32, factor: i32, intervals: &[i32]) -> usize {
    let mut idx = 0usize;
    let mut i = intervals.len() >> 1;
    while i > 0 {
        if i64::from(factor) * i64::from(intervals[idx + i]) <= (i64::from(value) << 24) {
            idx += i;
        }
        i >>= 1;
    }
    idx
}

/// 单个子带的量化输出
#[derive(Clone, Default)]
pub(crate) struct Quantize {
    /// 量化结果 (有符号下标)
    pub quantized_sample: i32,
    /// 替换后可翻转整帧奇偶的备选量化值
    pub quantized_sample_parity_change: i32,
    /// 量化误差幅度, 非负
    pub error: i32,
}

impl Quantize {
    pub(crate) fn quantize_difference(
        &mut self,
        sample_difference: i32,
        dither: i32,
        quantization_factor: i32,
        tables: &Tables,
    ) {
        let intervals = tables.quantize_intervals;

        let mut sample_difference_abs = sample_difference.abs();
        if sample_difference_abs > (1 << 23) - 1 {
            sample_difference_abs = (1 << 23) - 1;
        }

        let mut quantized_sample = bin_search(
            sample_difference_abs >> 4,
            quantization_factor,
            intervals,
        ) as i32;

        let d = rshift32_clip24(
            ((i64::from(dither) * i64::from(dither)) >> 32) as i32,
            7,
        ) - (1 << 23);
        let d = rshift64(
            i64::from(d) * i64::from(tables.quantize_dither_factors[quantized_sample as usize]),
            23,
        ) as i32;

        let idx = quantized_sample as usize;
        let mean = (intervals[idx + 1] + intervals[idx]) / 2;
        let interval = (intervals[idx + 1] - intervals[idx]) * (-((sample_difference < 0) as i32) | 1);

        let dithered_sample = rshift64_clip24(
            i64::from(dither) * i64::from(interval) + (i64::from(clip_intp2(mean + d, 23)) << 32),
            32,
        );
        let error = (i64::from(sample_difference_abs) << 20)
            - i64::from(dithered_sample) * i64::from(quantization_factor);
        self.error = (rshift64(error, 23) as i32).abs();

        let mut parity_change = quantized_sample;
        if error < 0 {
            quantized_sample -= 1;
        } else {
            parity_change -= 1;
        }

        let inv = -((sample_difference < 0) as i32);
        self.quantized_sample = quantized_sample ^ inv;
        self.quantized_sample_parity_change = parity_change ^ inv;
    }
}
