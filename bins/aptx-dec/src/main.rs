//! aptx-dec - aptX 解码命令行工具
//!
//! 从 stdin 读取 aptX 或 aptX HD 码流, 解码为原始 24 位有符号立体声
//! 小端 PCM 写到 stdout. 输入损坏 (丢字节) 时自动搜索同步点恢复,
//! 并在 stderr 报告丢弃的字节数.
//!
//! 示例:
//! ```text
//! aptx-dec < sample.aptx > sample.s24
//! aptx-dec --hd < sample.aptxhd > sample.s24
//! aptx-dec < sample.aptx | play -t raw -r 44.1k -s -3 -c 2 -
//! ```

mod logging;

use std::io::{self, Read, Write};
use std::process;

use clap::Parser;
use tracing::warn;

use aptx_codec::AptxContext;
use aptx_core::AptxResult;

/// 复位状态编码全零 PCM 得到的 aptX 流前缀, 用于流类型嗅探
const APTX_STREAM_PREFIX: [u8; 4] = [0x4b, 0xbf, 0x4b, 0xbf];
/// 对应的 aptX HD 流前缀
const APTX_HD_STREAM_PREFIX: [u8; 6] = [0x73, 0xbe, 0xff, 0x73, 0xbe, 0xff];

/// 每次从 stdin 读取的码流字节数 (512 x 8 帧)
const INPUT_BUFFER_SIZE: usize = 512 * 8 * 6;

#[derive(Parser, Debug)]
#[command(name = "aptx-dec", version, about = "aptX / aptX HD 解码工具 (stdin -> stdout)")]
struct Cli {
    /// 按 aptX HD 解码 (默认为 aptX)
    #[arg(long)]
    hd: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("错误: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> AptxResult<()> {
    let mut ctx = AptxContext::new(cli.hd);
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    let mut input = vec![0u8; INPUT_BUFFER_SIZE];
    // decode_sync 约定: 输出至少要装下整个输入的 PCM 展开加一帧
    let mut output = vec![0u8; INPUT_BUFFER_SIZE * 6 + 24];
    let mut synced = true;

    // 编码器对复位状态有固定首帧, 据此猜测输入流的变体
    let mut head = [0u8; 6];
    let head_len = read_full(&mut stdin, &mut head)?;
    if head_len >= 4 && head[..4] == APTX_STREAM_PREFIX {
        if cli.hd {
            warn!("输入看起来是 aptX 流 (而非 aptX HD), 请尝试去掉 --hd");
        }
    } else if head_len >= 6 && head == APTX_HD_STREAM_PREFIX {
        if !cli.hd {
            warn!("输入看起来是 aptX HD 流, 请尝试加上 --hd");
        }
    } else if head_len > 0 {
        warn!("输入不像 aptX 或 aptX HD 码流");
    }

    decode_chunk(&mut ctx, &head[..head_len], &mut output, &mut stdout, &mut synced)?;

    loop {
        let length = read_full(&mut stdin, &mut input)?;
        if length == 0 {
            break;
        }
        decode_chunk(&mut ctx, &input[..length], &mut output, &mut stdout, &mut synced)?;
        if length < input.len() {
            break;
        }
    }

    let cached = ctx.decode_sync_finish();
    if cached > 0 {
        warn!("丢弃 {cached} 字节不完整的尾部码字");
    }

    stdout.flush()?;
    Ok(())
}

/// 解码一段输入并上报同步状态变化
fn decode_chunk(
    ctx: &mut AptxContext,
    chunk: &[u8],
    output: &mut [u8],
    stdout: &mut impl Write,
    synced: &mut bool,
) -> AptxResult<()> {
    if chunk.is_empty() {
        return Ok(());
    }

    let status = ctx.decode_sync(chunk, output);

    if *synced && !status.synced {
        warn!("解码失败, 正在搜索同步点 ...");
    }
    if status.dropped > 0 {
        warn!("重新同步成功, 共丢弃 {} 字节", status.dropped);
    }
    *synced = status.synced;

    stdout.write_all(&output[..status.written])?;
    Ok(())
}

/// 反复读取直到填满缓冲或到达 EOF, 语义对齐 fread
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
