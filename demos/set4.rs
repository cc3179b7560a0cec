use anyhow::{ensure, Result};
use blockbreak::bitflip::ctr_bitflip;
use blockbreak::cbc::recover_key_as_iv;
use blockbreak::cipher::random_block;
use blockbreak::ctr::recover_with_edit;
use blockbreak::encode::{to_ascii, to_hex};
use blockbreak::oracle::{CommentFormat, CtrCommentOracle, CtrEditOracle, KeyAsIvOracle};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "CTR edit, CTR bitflipping and key-as-IV recovery")]
struct Args {
    /// plaintext stored behind the CTR edit API
    #[arg(long, default_value_t = String::from("I'm back and I'm ringin' the bell"))]
    secret: String,
}

fn ex25(secret: &str) -> Result<String> {
    let oracle = CtrEditOracle::random(&mut rand::thread_rng(), secret.as_bytes());
    let edit = |ct: &[u8], offset: usize, new: &[u8]| {
        oracle.edit(ct, offset, new).unwrap_or_default()
    };
    Ok(to_ascii(&recover_with_edit(oracle.ciphertext(), edit)))
}

fn ex26() -> Result<String> {
    let oracle = CtrCommentOracle::random(&mut rand::thread_rng(), CommentFormat::default());
    let ct = ctr_bitflip(&oracle)?;
    Ok(format!("admin: {}", oracle.is_admin(&ct)))
}

fn ex27() -> Result<String> {
    let key = random_block(&mut rand::thread_rng());
    let oracle = KeyAsIvOracle::new(key);
    let recovered = recover_key_as_iv(&oracle)?;
    ensure!(recovered == key, "recovered the wrong key");
    Ok(format!("key: {}", to_hex(&recovered)))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    println!("ex25:\n{}", ex25(&args.secret)?);
    println!("ex26:\n{}", ex26()?);
    println!("ex27:\n{}", ex27()?);
    Ok(())
}
