//! aptX 编解码性能基准测试.
//!
//! 覆盖两种变体的编码与解码吞吐.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use aptx::codec::AptxContext;

/// 生成 1 kHz / 44.1 kHz 正弦立体声 PCM (幅度 2^22)
fn make_sine_pcm(frames: usize) -> Vec<u8> {
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
fn encode_all(hd: bool, pcm: &[u8]) -> Vec<u8> {
    let mut ctx = AptxContext::new(hd);
    let mut stream = vec![0u8; pcm.len()];
    let (_, written) = ctx.encode(pcm, &mut stream);
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

fn bench_encode(c: &mut Criterion) {
    let pcm = make_sine_pcm(1024);

    c.bench_function("aptx_encode_1024_frames", |b| {
        let mut output = vec![0u8; 1024 * 4];
        b.iter(|| {
            let mut ctx = AptxContext::new(false);
            let (consumed, written) = ctx.encode(black_box(&pcm), &mut output);
            black_box((consumed, written));
        });
    });

    c.bench_function("aptxhd_encode_1024_frames", |b| {
        let mut output = vec![0u8; 1024 * 6];
        b.iter(|| {
            let mut ctx = AptxContext::new(true);
            let (consumed, written) = ctx.encode(black_box(&pcm), &mut output);
            black_box((consumed, written));
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let pcm = make_sine_pcm(1024);
    let stream = encode_all(false, &pcm);
    let stream_hd = encode_all(true, &pcm);

    c.bench_function("aptx_decode_1024_frames", |b| {
        let mut output = vec![0u8; stream.len() * 6 + 64];
        b.iter(|| {
            let mut ctx = AptxContext::new(false);
            let (consumed, written) = ctx.decode(black_box(&stream), &mut output);
            black_box((consumed, written));
        });
    });

    c.bench_function("aptxhd_decode_sync_1024_frames", |b| {
        let mut output = vec![0u8; stream_hd.len() * 6 + 24];
        b.iter(|| {
            let mut ctx = AptxContext::new(true);
            let status = ctx.decode_sync(black_box(&stream_hd), &mut output);
            black_box(status.written);
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
