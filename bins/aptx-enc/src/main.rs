//! aptx-enc - aptX 编码命令行工具
//!
//! 从 stdin 读取原始 24 位有符号立体声小端 PCM, 编码为 aptX 或
//! aptX HD 码流写到 stdout.
//!
//! 示例:
//! ```text
//! aptx-enc < sample.s24 > sample.aptx
//! aptx-enc --hd < sample.s24 > sample.aptxhd
//! sox sample.wav -t raw -r 44.1k -s -3 -c 2 - | aptx-enc > sample.aptx
//! ```

mod logging;

use std::io::{self, Read, Write};
use std::process;

use clap::Parser;
use tracing::warn;

use aptx_codec::AptxContext;
use aptx_core::AptxResult;

/// 每次从 stdin 读取的 PCM 字节数 (512 x 8 帧)
const INPUT_BUFFER_SIZE: usize = 512 * 8 * 3 * 2 * 4;
/// 码流输出缓冲, 足够容纳一整批输入的 aptX HD 编码结果
const OUTPUT_BUFFER_SIZE: usize = 512 * 8 * 6;

#[derive(Parser, Debug)]
#[command(name = "aptx-enc", version, about = "aptX / aptX HD 编码工具 (stdin -> stdout)")]
struct Cli {
    /// 编码为 aptX HD (默认为 aptX)
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
    let mut output = vec![0u8; OUTPUT_BUFFER_SIZE];

    loop {
        let length = read_full(&mut stdin, &mut input)?;
        if length == 0 {
            break;
        }

        let (processed, written) = ctx.encode(&input[..length], &mut output);
        stdout.write_all(&output[..written])?;

        if processed != length {
            warn!("输入在采样中间结束, 丢弃 {} 字节", length - processed);
            break;
        }
        if length < input.len() {
            break;
        }
    }

    // 冲洗 23 帧延迟填充; 缓冲不足时分批补齐
    loop {
        let (done, written) = ctx.encode_finish(&mut output);
        stdout.write_all(&output[..written])?;
        if done {
            break;
        }
    }

    stdout.flush()?;
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
