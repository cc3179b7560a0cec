use anyhow::{ensure, Result};
use blockbreak::bitflip::cbc_bitflip;
use blockbreak::block::{cbc_decrypt, cbc_encrypt};
use blockbreak::cipher::Aes128;
use blockbreak::ecb::{
    decrypt_suffix, decrypt_suffix_with_prefix, detect_mode, forge_admin_profile,
};
use blockbreak::encode::{from_base64, to_ascii};
use blockbreak::oracle::{
    CbcCommentOracle, CommentFormat, EcbOracle, ModeOracle, ProfileOracle,
};
use clap::Parser;

const ROLLIN: &str = "Um9sbGluJyBpbiBteSA1LjAKV2l0aCBteSByYWctdG9wIGRvd24gc28gbXkg\
    aGFpciBjYW4gYmxvdwpUaGUgZ2lybGllcyBvbiBzdGFuZGJ5IHdhdmluZyBqdXN0IHRvIHNheSBoaQpE\
    aWQgeW91IHN0b3A/IE5vLCBJIGp1c3QgZHJvdmUgYnkK";

#[derive(Parser, Debug)]
#[command(about = "ECB and CBC attacks")]
struct Args {
    /// number of ECB/CBC guesses to score
    #[arg(short, long, default_value_t = 20)]
    trials: usize,

    /// smallest random prefix for the byte-at-a-time oracle
    #[arg(long, default_value_t = 5)]
    min_prefix: usize,

    /// largest random prefix for the byte-at-a-time oracle
    #[arg(long, default_value_t = 40)]
    max_prefix: usize,
}

fn ex10() -> Result<String> {
    let c = Aes128::new(b"YELLOW SUBMARINE");
    let iv = [0; 16];
    let ct = cbc_encrypt(b"I'm back and I'm ringin' the bell", &c, &iv);
    Ok(to_ascii(&cbc_decrypt(&ct, &c, &iv)?))
}

fn ex11(trials: usize) -> Result<String> {
    let mut rng = rand::thread_rng();
    let correct = (0..trials)
        .filter(|_| {
            let oracle = ModeOracle::random(&mut rng);
            detect_mode(&oracle) == oracle.mode()
        })
        .count();
    Ok(format!("{}/{} modes detected", correct, trials))
}

fn ex12() -> Result<String> {
    let target = from_base64(ROLLIN)?;
    let oracle = EcbOracle::random(&mut rand::thread_rng(), 0..=0, target);
    let rec = decrypt_suffix(&oracle)?;
    Ok(to_ascii(&rec.target))
}

fn ex13() -> Result<String> {
    let oracle = ProfileOracle::random(&mut rand::thread_rng());
    let forged = forge_admin_profile(&oracle)?;
    Ok(format!("role={}", oracle.role_of(&forged)?))
}

fn ex14(min_prefix: usize, max_prefix: usize) -> Result<String> {
    ensure!(min_prefix <= max_prefix, "empty prefix range");
    let target = from_base64(ROLLIN)?;
    let oracle = EcbOracle::random(&mut rand::thread_rng(), min_prefix..=max_prefix, target);
    let rec = decrypt_suffix_with_prefix(&oracle)?;
    Ok(format!(
        "prefix of {} bytes\n{}",
        rec.prefix_len,
        to_ascii(&rec.target)
    ))
}

fn ex16() -> Result<String> {
    let mut rng = rand::thread_rng();
    let oracle = CbcCommentOracle::random(&mut rng, CommentFormat::default());
    let ct = cbc_bitflip(&oracle)?;
    Ok(format!("admin: {}", oracle.is_admin(&ct)?))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    println!("ex10:\n{}", ex10()?);
    println!("ex11:\n{}", ex11(args.trials)?);
    println!("ex12:\n{}", ex12()?);
    println!("ex13:\n{}", ex13()?);
    println!("ex14:\n{}", ex14(args.min_prefix, args.max_prefix)?);
    println!("ex16:\n{}", ex16()?);
    Ok(())
}
