//! 编码管线集成测试.
//!
//! 覆盖: 复位状态的固定流前缀、跨运行确定性、冲洗补齐帧数、
//! 输出缓冲流控下的分批编码等价、reset 隔离.

use aptx::codec::AptxContext;

/// 生成 1 kHz / 44.1 kHz 正弦立体声 PCM (幅度 2^22), 右声道带相位偏移
fn sine_pcm(frames: usize) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(frames * 24);
    for i in 0..frames * 4 {
        let phase = 2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 44100.0;
        let left = (phase.sin() * f64::from(1 << 22)) as i32;
        let right = ((phase + 0.5).sin() * f64::from(1 << 22)) as i32;
        for sample in [left, right] {
            pcm.push(sample as u8);
            pcm.push((sample >> 8) as u8);
            pcm.push((sample >> 16) as u8);
        }
    }
    pcm
}

/// 编码整段 PCM 并冲洗, 返回完整码流
fn encode_all(ctx: &mut AptxContext, pcm: &[u8]) -> Vec<u8> {
    let mut stream = vec![0u8; pcm.len()];
    let (consumed, written) = ctx.encode(pcm, &mut stream);
    assert_eq!(consumed, pcm.len());
    stream.truncate(written);

    let mut tail = [0u8; 6 * 23];
    loop {
        let (done, written) = ctx.encode_finish(&mut tail);
        stream.extend_from_slice(&tail[..written]);
        if done {
            break;
        }
    }
    stream
}

#[test]
fn test_零输入固定前缀() {
    let mut ctx = AptxContext::new(false);
    let pcm = vec![0u8; 24 * 16];
    let mut stream = vec![0u8; 4 * 16];
    let (consumed, written) = ctx.encode(&pcm, &mut stream);
    assert_eq!((consumed, written), (pcm.len(), stream.len()));
    assert_eq!(&stream[..4], &[0x4b, 0xbf, 0x4b, 0xbf]);

    let mut ctx = AptxContext::new(true);
    let mut stream = vec![0u8; 6 * 16];
    let (consumed, written) = ctx.encode(&pcm, &mut stream);
    assert_eq!((consumed, written), (pcm.len(), stream.len()));
    assert_eq!(&stream[..6], &[0x73, 0xbe, 0xff, 0x73, 0xbe, 0xff]);
}

#[test]
fn test_编码确定性() {
    for hd in [false, true] {
        let pcm = sine_pcm(64);
        let a = encode_all(&mut AptxContext::new(hd), &pcm);
        let b = encode_all(&mut AptxContext::new(hd), &pcm);
        assert_eq!(a, b);
    }
}

/// M 帧输入 + 冲洗恰好产出 M + 23 个码字
#[test]
fn test_冲洗补齐帧数() {
    for hd in [false, true] {
        let sample_size = if hd { 6 } else { 4 };
        for frames in [0usize, 1, 7, 100] {
            let mut ctx = AptxContext::new(hd);
            let stream = encode_all(&mut ctx, &sine_pcm(frames));
            assert_eq!(stream.len(), (frames + 23) * sample_size, "hd={hd} frames={frames}");

            // 冲洗完成后再调用立即返回且不产出
            let mut extra = [0u8; 64];
            assert_eq!(ctx.encode_finish(&mut extra), (true, 0));
        }
    }
}

/// 输出缓冲一次只装一帧时, 分批编码与整体编码字节一致
#[test]
fn test_小输出缓冲分批编码等价() {
    let pcm = sine_pcm(50);
    let reference = encode_all(&mut AptxContext::new(false), &pcm);

    let mut ctx = AptxContext::new(false);
    let mut stream = Vec::new();
    let mut chunk = [0u8; 4];
    let mut ipos = 0;
    while ipos < pcm.len() {
        let (consumed, written) = ctx.encode(&pcm[ipos..], &mut chunk);
        ipos += consumed;
        stream.extend_from_slice(&chunk[..written]);
    }
    loop {
        let (done, written) = ctx.encode_finish(&mut chunk);
        stream.extend_from_slice(&chunk[..written]);
        if done {
            break;
        }
    }
    assert_eq!(stream, reference);
}

/// 编码流 A 后 reset, 再编码流 B, 结果与全新上下文编码 B 一致
#[test]
fn test_reset_隔离() {
    let a = sine_pcm(37);
    let b = sine_pcm(64);

    let mut ctx = AptxContext::new(false);
    let mut scratch = vec![0u8; a.len()];
    ctx.encode(&a, &mut scratch);
    ctx.reset();
    let after_reset = encode_all(&mut ctx, &b);

    let fresh = encode_all(&mut AptxContext::new(false), &b);
    assert_eq!(after_reset, fresh);
}
