//! 单声道编解码状态.
//!
//! 每个声道持有: 码字历史驱动的抖动发生器、QMF 树、4 个子带各自的
//! 量化 / 逆量化 / 预测状态, 以及两种变体的码字打包与解包.
//!
//! 码字布局 (每声道, 大端发送):
//! ```text
//! aptX    (16 bit): [q3(2) | parity(1) | q2(2) | q1(4) | q0(7)]
//! aptX HD (24 bit): [q3(4) | parity(1) | q2(4) | q1(6) | q0(9)]
//! ```
//! 解包时各字段按位宽 {7,4,2,3} / {9,6,4,5} 符号扩展, 随后 q3 的最低位
//! 由本声道奇偶重建, 使下游算术拿到与编码端一致的值.

use aptx_core::intmath::{clip_intp2, sign_extend};

use crate::prediction::{InvertQuantize, Prediction};
use crate::qmf::QmfAnalysis;
use crate::quantize::Quantize;
use crate::tables::variant_tables;
use crate::NB_SUBBANDS;

/// 单声道编解码状态
#[derive(Clone, Default)]
pub(crate) struct Channel {
    pub codeword_history: i32,
    pub dither_parity: i32,
    pub dither: [i32; NB_SUBBANDS],

    pub qmf: QmfAnalysis,
    pub quantize: [Quantize; NB_SUBBANDS],
    pub invert_quantize: [InvertQuantize; NB_SUBBANDS],
    pub prediction: [Prediction; NB_SUBBANDS],
}

impl Channel {
    /// 把上一帧量化值的低位折进码字历史 (模 2^32 回绕)
    fn update_codeword_history(&mut self) {
        let cw = (self.quantize[0].quantized_sample & 3)
            | ((self.quantize[1].quantized_sample & 2) << 1)
            | ((self.quantize[2].quantized_sample & 1) << 3);
        self.codeword_history = (cw << 8).wrapping_add(self.codeword_history << 4);
    }

    /// 由码字历史派生本帧各子带抖动值与抖动奇偶位
    pub(crate) fn generate_dither(&mut self) {
        self.update_codeword_history();

        let m = 5184443i64 * i64::from(self.codeword_history >> 7);
        let d = (m * 4 + (m >> 22)) as i32;
        for subband in 0..NB_SUBBANDS {
            self.dither[subband] = d << (23 - 5 * subband);
        }
        self.dither_parity = (d >> 25) & 1;
    }

    /// 编码方向: QMF 分析 + 抖动 + 各子带差分量化
    pub(crate) fn encode_channel(&mut self, samples: &[i32; 4], hd: bool) {
        let mut subband_samples = [0i32; NB_SUBBANDS];
        self.qmf.tree_analysis(samples, &mut subband_samples);
        self.generate_dither();

        let tables = variant_tables(hd);
        for subband in 0..NB_SUBBANDS {
            let diff = clip_intp2(
                subband_samples[subband] - self.prediction[subband].predicted_sample,
                23,
            );
            self.quantize[subband].quantize_difference(
                diff,
                self.dither[subband],
                self.invert_quantize[subband].quantization_factor,
                &tables[subband],
            );
        }
    }

    /// 解码方向: 以各子带预测器的重建采样做 QMF 合成
    pub(crate) fn decode_channel(&mut self) -> [i32; 4] {
        let mut subband_samples = [0i32; NB_SUBBANDS];
        for (subband, sample) in subband_samples.iter_mut().enumerate() {
            *sample = self.prediction[subband].previous_reconstructed_sample;
        }
        let mut samples = [0i32; 4];
        self.qmf.tree_synthesis(&subband_samples, &mut samples);
        samples
    }

    /// 逆量化 + 预测, 编码端与解码端共用, 保证状态镜像
    pub(crate) fn invert_quantize_and_prediction(&mut self, hd: bool) {
        let tables = variant_tables(hd);
        for subband in 0..NB_SUBBANDS {
            self.prediction[subband].process_subband(
                &mut self.invert_quantize[subband],
                self.quantize[subband].quantized_sample,
                self.dither[subband],
                &tables[subband],
            );
        }
    }

    /// 本声道奇偶: 抖动奇偶与 4 个量化值的按位异或, 取最低位
    pub(crate) fn quantized_parity(&self) -> i32 {
        let mut parity = self.dither_parity;
        for quantize in &self.quantize {
            parity ^= quantize.quantized_sample;
        }
        parity & 1
    }

    pub(crate) fn pack_codeword(&self) -> u16 {
        let parity = self.quantized_parity();
        ((((self.quantize[3].quantized_sample & 0x06) | parity) << 13)
            | ((self.quantize[2].quantized_sample & 0x03) << 11)
            | ((self.quantize[1].quantized_sample & 0x0F) << 7)
            | (self.quantize[0].quantized_sample & 0x7F)) as u16
    }

    pub(crate) fn pack_codeword_hd(&self) -> u32 {
        let parity = self.quantized_parity();
        ((((self.quantize[3].quantized_sample & 0x01E) | parity) << 19)
            | ((self.quantize[2].quantized_sample & 0x00F) << 15)
            | ((self.quantize[1].quantized_sample & 0x03F) << 9)
            | (self.quantize[0].quantized_sample & 0x1FF)) as u32
    }

    pub(crate) fn unpack_codeword(&mut self, codeword: u16) {
        let codeword = i32::from(codeword);
        self.quantize[0].quantized_sample = sign_extend(codeword, 7);
        self.quantize[1].quantized_sample = sign_extend(codeword >> 7, 4);
        self.quantize[2].quantized_sample = sign_extend(codeword >> 11, 2);
        self.quantize[3].quantized_sample = sign_extend(codeword >> 13, 3);
        self.quantize[3].quantized_sample =
            (self.quantize[3].quantized_sample & !1) | self.quantized_parity();
    }

    pub(crate) fn unpack_codeword_hd(&mut self, codeword: u32) {
        let codeword = codeword as i32;
        self.quantize[0].quantized_sample = sign_extend(codeword, 9);
        self.quantize[1].quantized_sample = sign_extend(codeword >> 9, 6);
        self.quantize[2].quantized_sample = sign_extend(codeword >> 15, 4);
        self.quantize[3].quantized_sample = sign_extend(codeword >> 19, 5);
        self.quantize[3].quantized_sample =
            (self.quantize[3].quantized_sample & !1) | self.quantized_parity();
    }
}
