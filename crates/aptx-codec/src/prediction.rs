//! 逆量化与后向自适应预测.
//!
//! 逆量化依据量化下标重建差分并更新 factor_select -> quantization_factor
//! 自适应映射; 预测器用两个符号权重加 N 个差分权重 (N = 各子带预测阶数)
//! 跟踪重建序列, 产生下一拍的 `predicted_sample` 与 `predicted_difference`.
//! 编码端与解码端运行完全相同的路径, 状态因此保持镜像.

use aptx_core::intmath::{clip_intp2, diffsign, rshift32, rshift64_clip24};

use crate::tables::{Tables, QUANTIZATION_FACTORS};

/// 逆量化状态
#[derive(Clone, Default)]
pub(crate) struct InvertQuantize {
    pub quantization_factor: i32,
    pub factor_select: i32,
    pub reconstructed_difference: i32,
}

impl InvertQuantize {
    /// 由量化下标与抖动重建差分, 并推进量化因子自适应
    pub(crate) fn invert_quantization(
        &mut self,
        quantized_sample: i32,
        dither: i32,
        tables: &Tables,
    ) {
        // 折叠负下标并保留 0 号区间
        let idx = ((quantized_sample ^ -((quantized_sample < 0) as i32)) + 1) as usize;
        let mut qr = tables.quantize_intervals[idx] / 2;
        if quantized_sample < 0 {
            qr = -qr;
        }

        let qr = rshift64_clip24(
            (i64::from(qr) << 32)
                + i64::from(dither) * i64::from(tables.invert_quantize_dither_factors[idx]),
            32,
        );
        self.reconstructed_difference =
            ((i64::from(self.quantization_factor) * i64::from(qr)) >> 19) as i32;

        // factor_select 自适应: 泄漏累积加区间偏移
        let factor_select = 32620 * self.factor_select;
        let factor_select = rshift32(
            factor_select + (i32::from(tables.quantize_factor_select_offset[idx]) * (1 << 15)),
            15,
        );
        self.factor_select = factor_select.clamp(0, tables.factor_max);

        // 量化因子 = 基表查值左移 11 位后按剩余量程右移
        let idx = ((self.factor_select & 0xFF) >> 3) as usize;
        let shift = (tables.factor_max - self.factor_select) >> 8;
        self.quantization_factor = (i32::from(QUANTIZATION_FACTORS[idx]) << 11) >> shift;
    }
}

/// 单个子带的预测器状态
#[derive(Clone)]
pub(crate) struct Prediction {
    pub prev_sign: [i32; 2],
    pub s_weight: [i32; 2],
    pub d_weight: [i32; 24],
    pub pos: usize,
    /// 双份副本的重建差分环形缓冲, 长度 2 x 预测阶数
    pub reconstructed_differences: [i32; 48],
    pub previous_reconstructed_sample: i32,
    pub predicted_difference: i32,
    pub predicted_sample: i32,
}

impl Default for Prediction {
    fn default() -> Self {
        Self {
            prev_sign: [1, 1],
            s_weight: [0; 2],
            d_weight: [0; 24],
            pos: 0,
            reconstructed_differences: [0; 48],
            previous_reconstructed_sample: 0,
            predicted_difference: 0,
            predicted_sample: 0,
        }
    }
}

impl Prediction {
    /// 追加一个重建差分并返回最新元素在平铺数组中的下标.
    ///
    /// 缓冲前半与后半各存一份, 最新 `order` 个元素总能以
    /// `head - i` (i in 0..order) 连续向前读取.
    fn reconstructed_differences_update(
        &mut self,
        reconstructed_difference: i32,
        order: usize,
    ) -> usize {
        let p = self.pos;
        self.reconstructed_differences[p] = self.reconstructed_differences[order + p];
        let p = (p + 1) % order;
        self.pos = p;
        self.reconstructed_differences[order + p] = reconstructed_difference;
        order + p
    }

    /// 差分权重更新与线性预测
    fn prediction_filtering(&mut self, reconstructed_difference: i32, order: usize) {
        let reconstructed_sample =
            clip_intp2(reconstructed_difference + self.predicted_sample, 23);
        let predictor = clip_intp2(
            ((i64::from(self.s_weight[0]) * i64::from(self.previous_reconstructed_sample)
                + i64::from(self.s_weight[1]) * i64::from(reconstructed_sample))
                >> 22) as i32,
            23,
        );
        self.previous_reconstructed_sample = reconstructed_sample;

        let head = self.reconstructed_differences_update(reconstructed_difference, order);
        let srd0 = diffsign(reconstructed_difference, 0) * (1 << 23);
        let mut predicted_difference: i64 = 0;
        for i in 0..order {
            let srd = (self.reconstructed_differences[head - i - 1] >> 31) | 1;
            self.d_weight[i] -= rshift32(self.d_weight[i] - srd * srd0, 8);
            predicted_difference +=
                i64::from(self.reconstructed_differences[head - i]) * i64::from(self.d_weight[i]);
        }

        self.predicted_difference = clip_intp2((predicted_difference >> 22) as i32, 23);
        self.predicted_sample = clip_intp2(predictor + self.predicted_difference, 23);
    }

    /// 子带处理: 逆量化后更新符号权重并做预测滤波
    pub(crate) fn process_subband(
        &mut self,
        invert_quantize: &mut InvertQuantize,
        quantized_sample: i32,
        dither: i32,
        tables: &Tables,
    ) {
        invert_quantize.invert_quantization(quantized_sample, dither, tables);

        // 符号相关更新; diffsign 的 0 值分支不可省略
        let sign = diffsign(
            invert_quantize.reconstructed_difference,
            -self.predicted_difference,
        );
        let same_sign = [sign * self.prev_sign[0], sign * self.prev_sign[1]];
        self.prev_sign[0] = self.prev_sign[1];
        self.prev_sign[1] = sign | 1;

        let sw1 = rshift32(-same_sign[1] * self.s_weight[1], 1);
        let sw1 = (sw1.clamp(-0x10_0000, 0x10_0000) & !0xF) * 16;

        let weight0 = 254 * self.s_weight[0] + 0x80_0000 * same_sign[0] + sw1;
        self.s_weight[0] = rshift32(weight0, 8).clamp(-0x30_0000, 0x30_0000);

        let range = 0x3C_0000 - self.s_weight[0];
        let weight1 = 255 * self.s_weight[1] + 0xC0_0000 * same_sign[1];
        self.s_weight[1] = rshift32(weight1, 8).clamp(-range, range);

        self.prediction_filtering(
            invert_quantize.reconstructed_difference,
            tables.prediction_order,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::variant_tables;

    #[test]
    fn test_invert_quantization_初始状态() {
        // 复位状态下输入 0: factor_select 被偏移 -21 拉到负值后裁剪回 0,
        // 量化因子 = (2048 << 11) >> 17 = 32
        let mut iq = InvertQuantize::default();
        let tables = &variant_tables(false)[0];
        iq.invert_quantization(0, 0, tables);
        assert_eq!(iq.reconstructed_difference, 0);
        assert_eq!(iq.factor_select, 0);
        assert_eq!(iq.quantization_factor, 32);
    }

    #[test]
    fn test_factor_select_不超过上限() {
        let mut iq = InvertQuantize::default();
        let tables = &variant_tables(false)[0];
        // 连续输入最大下标, factor_select 单调上升但始终被 factor_max 封顶
        for _ in 0..256 {
            iq.invert_quantization(63, 0, tables);
            assert!(iq.factor_select >= 0 && iq.factor_select <= tables.factor_max);
        }
        assert_eq!(iq.factor_select, tables.factor_max);
    }

    #[test]
    fn test_环形缓冲双份副本() {
        let mut prediction = Prediction::default();
        let order = 8;
        for v in 1..=20 {
            let head = prediction.reconstructed_differences_update(v, order);
            assert_eq!(prediction.reconstructed_differences[head], v);
            // 最新 order 个元素可从 head 连续向前读
            let newest = v.min(order as i32);
            for i in 0..newest {
                assert_eq!(
                    prediction.reconstructed_differences[head - i as usize],
                    v - i,
                );
            }
        }
    }

    #[test]
    fn test_prev_sign_初始为正() {
        let prediction = Prediction::default();
        assert_eq!(prediction.prev_sign, [1, 1]);
    }
}
