//! 字节级流式驱动.
//!
//! PCM 侧以 24 字节 (4 采样 x 3 字节 x 2 声道, 24 位有符号小端交织)
//! 为一帧, 码流侧以 4 字节 (aptX) 或 6 字节 (aptX HD) 为一帧.
//! 所有入口只在输入输出两侧都有余量时推进, 以 (已消费, 已写出)
//! 字节数表达流控; 解码端的奇偶失败同样由 `已消费 < 输入长度` 表达.

use log::debug;

use crate::{AptxContext, LATENCY_SAMPLES, NB_CHANNELS};

/// [`AptxContext::decode_sync`] 一次调用的结果
#[derive(Debug, Clone, Copy)]
pub struct DecodeSyncStatus {
    /// 从输入消费的字节数 (含丢弃与缓存的字节)
    pub processed: usize,
    /// 写出的 PCM 字节数
    pub written: usize,
    /// 调用结束时解码器是否处于已同步状态
    pub synced: bool,
    /// 本次调用确认丢弃的字节数
    pub dropped: usize,
}

/// 读一个 24 位有符号小端采样, 存为 i32
#[inline]
fn read_pcm24le(input: &[u8]) -> i32 {
    i32::from(input[0]) | (i32::from(input[1]) << 8) | (i32::from(input[2] as i8) << 16)
}

/// 写一个 24 位有符号小端采样; 负数的第 23 位已置位, 直接截取低 3 字节
#[inline]
fn write_pcm24le(output: &mut [u8], sample: i32) {
    output[0] = sample as u8;
    output[1] = (sample >> 8) as u8;
    output[2] = (sample >> 16) as u8;
}

impl AptxContext {
    /// 编码 PCM 字节流.
    ///
    /// 每消费 24 字节 PCM (格式 LLLRRR x 4) 产出一帧码字 (LLRR 或
    /// LLLRRR). 返回 (已消费, 已写出); 任一侧不足一帧即停下,
    /// 调用方带着剩余数据继续.
    pub fn encode(&mut self, input: &[u8], output: &mut [u8]) -> (usize, usize) {
        let sample_size = self.sample_size();
        let mut ipos = 0;
        let mut opos = 0;

        while ipos + 3 * NB_CHANNELS * 4 <= input.len() && opos + sample_size <= output.len() {
            let mut samples = [[0i32; 4]; NB_CHANNELS];
            for sample in 0..4 {
                for channel_samples in samples.iter_mut() {
                    channel_samples[sample] = read_pcm24le(&input[ipos..]);
                    ipos += 3;
                }
            }
            self.encode_samples(&samples, &mut output[opos..opos + sample_size]);
            opos += sample_size;
        }

        (ipos, opos)
    }

    /// 结束当前流的编码: 喂入零帧直到补满 23 帧延迟填充.
    ///
    /// 返回 (是否完成, 已写出). 输出缓冲不足时返回未完成并保留状态,
    /// 后续调用继续补齐; 完成时上下文已复位, 可直接用于新的流.
    pub fn encode_finish(&mut self, output: &mut [u8]) -> (bool, usize) {
        let sample_size = self.sample_size();

        if self.encode_remaining == 0 {
            return (true, 0);
        }

        let samples = [[0i32; 4]; NB_CHANNELS];
        let mut opos = 0;
        while self.encode_remaining > 0 && opos + sample_size <= output.len() {
            self.encode_samples(&samples, &mut output[opos..opos + sample_size]);
            self.encode_remaining -= 1;
            opos += sample_size;
        }

        if self.encode_remaining > 0 {
            return (false, opos);
        }
        self.reset();
        (true, opos)
    }

    /// 解码码字流.
    ///
    /// 前 23 帧被延迟吸收丢弃, 第 23 帧从采样下标 2 开始出数.
    /// 奇偶校验失败立即停止, 此时已消费 < 输入长度.
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> (usize, usize) {
        let sample_size = self.sample_size();
        let mut ipos = 0;
        let mut opos = 0;

        while ipos + sample_size <= input.len()
            && (opos + 3 * NB_CHANNELS * 4 <= output.len() || self.decode_skip_leading > 0)
        {
            let (samples, parity_ok) = self.decode_samples(&input[ipos..ipos + sample_size]);
            if !parity_ok {
                break;
            }

            let mut sample = 0;
            if self.decode_skip_leading > 0 {
                self.decode_skip_leading -= 1;
                if self.decode_skip_leading > 0 {
                    ipos += sample_size;
                    continue;
                }
                sample = LATENCY_SAMPLES % 4;
            }
            while sample < 4 {
                for channel_samples in samples.iter() {
                    write_pcm24le(&mut output[opos..], channel_samples[sample]);
                    opos += 3;
                }
                sample += 1;
            }
            ipos += sample_size;
        }

        (ipos, opos)
    }

    /// 自动重同步解码, 适用于可能丢字节的连续码流.
    ///
    /// 奇偶失败不再终止: 从失败码字起点的下一个字节重新搜索同步点,
    /// 连续 23 个码字解码成功后确认同步并一次性上报累计丢弃字节数.
    /// 不足一个码字的尾部字节缓存在上下文内, 供下次调用拼接.
    ///
    /// 输出缓冲须不小于 `input.len()` 对应的 PCM 展开再加一帧 (24 字节).
    pub fn decode_sync(&mut self, input: &[u8], output: &mut [u8]) -> DecodeSyncStatus {
        let sample_size = self.sample_size();
        let mut synced = false;
        let mut dropped = 0usize;
        let mut ipos = 0;
        let mut opos = 0;

        // 先把内部缓存补到 sample_size - 1 字节, 最后一字节留待逐个尝试
        if self.decode_sync_buffer_len > 0
            && sample_size - 1 - self.decode_sync_buffer_len <= input.len()
        {
            while self.decode_sync_buffer_len < sample_size - 1 {
                self.decode_sync_buffer[self.decode_sync_buffer_len] = input[ipos];
                ipos += 1;
                self.decode_sync_buffer_len += 1;
            }
        }

        // 缓存拼接循环: 仅当一个码字横跨缓存与输入时走这里
        while self.decode_sync_buffer_len == sample_size - 1
            && ipos < sample_size
            && ipos < input.len()
            && (opos + 3 * NB_CHANNELS * 4 <= output.len()
                || self.decode_skip_leading > 0
                || self.decode_dropped > 0)
        {
            self.decode_sync_buffer[sample_size - 1] = input[ipos];
            ipos += 1;

            let cache = self.decode_sync_buffer;
            let (processed_step, written_step) =
                self.decode(&cache[..sample_size], &mut output[opos..]);
            opos += written_step;

            if self.decode_dropped > 0 && processed_step == sample_size {
                self.decode_dropped += processed_step;
                self.decode_sync_packets += 1;
                if self.decode_sync_packets >= LATENCY_SAMPLES.div_ceil(4) {
                    dropped += self.decode_dropped;
                    self.decode_dropped = 0;
                    self.decode_sync_packets = 0;
                }
            }

            if processed_step < sample_size {
                debug!("缓存拼接码字解码失败, 丢弃 1 字节后继续搜索同步点");
                self.reset_decode_sync();
                synced = false;
                self.decode_dropped += 1;
                self.decode_sync_packets = 0;
                for i in 0..sample_size - 1 {
                    self.decode_sync_buffer[i] = self.decode_sync_buffer[i + 1];
                }
            } else {
                if self.decode_dropped == 0 {
                    synced = true;
                }
                self.decode_sync_buffer_len = 0;
            }
        }

        // 缓存拼接始终失败时, 余下字节全部来自输入缓冲, 丢弃缓存重新走主循环
        if self.decode_sync_buffer_len == sample_size - 1 && ipos == sample_size {
            ipos = 0;
            self.decode_sync_buffer_len = 0;
        }

        // 主解码循环: 整码字批量解码, 失败则从失败码字的下一个字节重试
        while ipos + sample_size <= input.len()
            && (opos + 3 * NB_CHANNELS * 4 <= output.len()
                || self.decode_skip_leading > 0
                || self.decode_dropped > 0)
        {
            let mut input_size_step = ((output.len() - opos) / 3 * NB_CHANNELS * 4
                + self.decode_skip_leading as usize)
                * sample_size;
            if input_size_step > (input.len() - ipos) / sample_size * sample_size {
                input_size_step = (input.len() - ipos) / sample_size * sample_size;
            }
            if self.decode_dropped > 0
                && input_size_step
                    > (LATENCY_SAMPLES.div_ceil(4) - self.decode_sync_packets) * sample_size
            {
                input_size_step =
                    (LATENCY_SAMPLES.div_ceil(4) - self.decode_sync_packets) * sample_size;
            }

            let (processed_step, written_step) =
                self.decode(&input[ipos..ipos + input_size_step], &mut output[opos..]);
            ipos += processed_step;
            opos += written_step;

            if self.decode_dropped > 0 && processed_step / sample_size > 0 {
                self.decode_dropped += processed_step;
                self.decode_sync_packets += processed_step / sample_size;
                if self.decode_sync_packets >= LATENCY_SAMPLES.div_ceil(4) {
                    dropped += self.decode_dropped;
                    self.decode_dropped = 0;
                    self.decode_sync_packets = 0;
                }
            }

            if processed_step < input_size_step {
                debug!("码字解码失败, 跳过 1 字节后继续搜索同步点");
                self.reset_decode_sync();
                synced = false;
                ipos += 1;
                self.decode_dropped += 1;
                self.decode_sync_packets = 0;
            } else if self.decode_dropped == 0 {
                synced = true;
            }
        }

        // 不足一个码字的尾部字节存入内部缓存
        if ipos + sample_size > input.len() {
            while ipos < input.len() {
                self.decode_sync_buffer[self.decode_sync_buffer_len] = input[ipos];
                self.decode_sync_buffer_len += 1;
                ipos += 1;
            }
        }

        DecodeSyncStatus {
            processed: ipos,
            written: opos,
            synced,
            dropped,
        }
    }

    /// 结束自动重同步解码: 返回缓存中将被丢弃的字节数并复位上下文
    pub fn decode_sync_finish(&mut self) -> usize {
        let dropped = self.decode_sync_buffer_len;
        self.reset();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 全零 PCM 从复位状态编码出的流前缀是固定的, 可用于流类型嗅探
    #[test]
    fn test_零输入流前缀() {
        let mut ctx = AptxContext::new(false);
        let input = [0u8; 24 * 8];
        let mut output = [0u8; 4 * 8];
        let (consumed, written) = ctx.encode(&input, &mut output);
        assert_eq!(consumed, input.len());
        assert_eq!(written, output.len());
        assert_eq!(&output[..4], &[0x4b, 0xbf, 0x4b, 0xbf]);

        let mut ctx = AptxContext::new(true);
        let mut output = [0u8; 6 * 8];
        let (consumed, written) = ctx.encode(&input, &mut output);
        assert_eq!(consumed, input.len());
        assert_eq!(written, output.len());
        assert_eq!(&output[..6], &[0x73, 0xbe, 0xff, 0x73, 0xbe, 0xff]);
    }

    #[test]
    fn test_encode_输入不足一帧不消费() {
        let mut ctx = AptxContext::new(false);
        let input = [0u8; 23];
        let mut output = [0u8; 64];
        assert_eq!(ctx.encode(&input, &mut output), (0, 0));
    }

    #[test]
    fn test_encode_输出不足一帧不消费() {
        let mut ctx = AptxContext::new(false);
        let input = [0u8; 24];
        let mut output = [0u8; 3];
        assert_eq!(ctx.encode(&input, &mut output), (0, 0));
    }

    #[test]
    fn test_encode_finish_分批冲洗() {
        let mut ctx = AptxContext::new(false);
        // 输出缓冲一次只装得下 10 帧, 需要多次调用
        let mut output = [0u8; 4 * 10];
        let (done, written) = ctx.encode_finish(&mut output);
        assert!(!done);
        assert_eq!(written, 40);

        let (done, written) = ctx.encode_finish(&mut output);
        assert!(!done);
        assert_eq!(written, 40);

        let (done, written) = ctx.encode_finish(&mut output);
        assert!(done);
        assert_eq!(written, 4 * 3);

        // 完成后再调用立即返回, 不产出数据
        let (done, written) = ctx.encode_finish(&mut output);
        assert!(done);
        assert_eq!(written, 0);
    }

    #[test]
    fn test_pcm24_读写往返() {
        let mut buf = [0u8; 3];
        for v in [0, 1, -1, 4242, -4242, (1 << 23) - 1, -(1 << 23)] {
            write_pcm24le(&mut buf, v);
            assert_eq!(read_pcm24le(&buf), v);
        }
    }

    #[test]
    fn test_decode_sync_尾部字节缓存() {
        // 构造合法码流再截留尾部字节, decode_sync_finish 应报告缓存数
        let mut enc = AptxContext::new(true);
        let pcm = vec![0u8; 24 * 64];
        let mut stream = vec![0u8; 6 * 64];
        let (_, written) = enc.encode(&pcm, &mut stream);
        assert_eq!(written, stream.len());

        for k in 1..6 {
            let mut dec = AptxContext::new(true);
            let mut pcm_out = vec![0u8; stream.len() * 6 + 24];
            let truncated = &stream[..6 * 32 + k];
            let status = dec.decode_sync(truncated, &mut pcm_out);
            assert_eq!(status.processed, truncated.len());
            assert_eq!(dec.decode_sync_finish(), k, "尾部 {k} 字节");
        }
    }
}
