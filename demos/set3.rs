use anyhow::{Context, Result};
use blockbreak::block::unpad_pkcs7;
use blockbreak::cbc::decrypt_with_padding_oracle;
use blockbreak::cipher::{random_block, Aes128, BLOCK_SIZE};
use blockbreak::ctr::{break_fixed_nonce, ctr_decrypt, ctr_encrypt};
use blockbreak::encode::{from_base64, to_ascii};
use blockbreak::mersenne::{crack_time_seed, Mt19937, MT19937, N};
use blockbreak::oracle::{CbcPaddingOracle, EncryptionOracle, MtStreamOracle};
use blockbreak::stream::{is_mt_token, recover_seed_from_suffix, reset_token, time_seed};
use clap::Parser;
use rand::Rng;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(about = "Padding oracle, CTR and Mersenne Twister attacks")]
struct Args {
    /// base64 lines to encrypt under one CTR nonce and break again
    #[arg(long)]
    lines: Option<PathBuf>,

    /// seconds to look back when cracking a timestamp seed
    #[arg(long, default_value_t = 2000)]
    window: u32,

    /// length of generated reset tokens
    #[arg(long, default_value_t = 16)]
    token_len: usize,
}

const LINES: [&str; 8] = [
    "SSBoYXZlIG1ldCB0aGVtIGF0IGNsb3NlIG9mIGRheQ==",
    "Q29taW5nIHdpdGggdml2aWQgZmFjZXM=",
    "RnJvbSBjb3VudGVyIG9yIGRlc2sgYW1vbmcgZ3JleQ==",
    "RWlnaHRlZW50aC1jZW50dXJ5IGhvdXNlcy4=",
    "SSBoYXZlIHBhc3NlZCB3aXRoIGEgbm9kIG9mIHRoZSBoZWFk",
    "T3IgcG9saXRlIG1lYW5pbmdsZXNzIHdvcmRzLA==",
    "T3IgaGF2ZSBsaW5nZXJlZCBhd2hpbGUgYW5kIHNhaWQ=",
    "UG9saXRlIG1lYW5pbmdsZXNzIHdvcmRzLA==",
];

fn now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

fn ex17() -> Result<String> {
    let oracle = CbcPaddingOracle::random(&mut rand::thread_rng())?;
    let (iv, ct) = oracle.ciphertext();
    let pt = decrypt_with_padding_oracle(&iv, &ct, &oracle)?;
    Ok(to_ascii(&unpad_pkcs7(pt, BLOCK_SIZE)?))
}

fn ex18() -> Result<String> {
    let ct = from_base64(
        "L77na/nrFsKvynd6HzOoG7GHTLXsTVu9qvY/2syLXzhPweyyMTJULu/6/kXX0KSvoOLSFQ==",
    )?;
    let c = Aes128::new(b"YELLOW SUBMARINE");
    Ok(to_ascii(&ctr_decrypt(&ct, &c, &[0; 8])))
}

fn ex19(lines: Option<PathBuf>) -> Result<String> {
    let lines: Vec<Vec<u8>> = match lines {
        Some(path) => {
            let file = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            file.lines().map(from_base64).collect::<Result<_, _>>()?
        }
        None => LINES.iter().map(|l| from_base64(l)).collect::<Result<_, _>>()?,
    };
    let mut rng = rand::thread_rng();
    let c = Aes128::new(&random_block(&mut rng));
    let encrs: Vec<_> = lines.iter().map(|l| ctr_encrypt(l, &c, &[0; 8])).collect();
    let decrs = break_fixed_nonce(&encrs);
    let decrs: Vec<_> = decrs.iter().map(|d| to_ascii(d)).collect();
    Ok(decrs.join("\n"))
}

fn ex21() -> Result<String> {
    let mut mt = Mt19937::from_seed(0);
    let outputs: Vec<_> = (0..3).map(|_| mt.next_u32().to_string()).collect();
    Ok(outputs.join(", "))
}

fn ex22(window: u32) -> Result<String> {
    let mut rng = rand::thread_rng();
    let now = now()? as u32;
    let seeded_at = now - rng.gen_range(40..=window.max(40));
    let output = Mt19937::from_seed(seeded_at).next_u32();
    let seed = crack_time_seed(output, now, window.max(40))?;
    Ok(format!("seeded at {}, cracked {}", seeded_at, seed))
}

fn ex23() -> Result<String> {
    let mut mt = Mt19937::from_seed(rand::thread_rng().gen());
    let outputs: Vec<_> = (0..N).map(|_| mt.next_u32()).collect();
    let mut clone = Mt19937::clone_from_outputs(MT19937, &outputs)?;
    let same = (0..1000).all(|_| clone.next_u32() == mt.next_u32());
    Ok(format!("clone tracks original: {}", same))
}

fn ex24(token_len: usize) -> Result<String> {
    let mut rng = rand::thread_rng();
    let oracle = MtStreamOracle::random(&mut rng, 5..=50);
    let ct = oracle.encrypt(&[b'A'; 14]);
    let seed = recover_seed_from_suffix(&ct, &[b'A'; 14])?;

    let token = reset_token(time_seed(now()?), token_len);
    let random: Vec<u8> = (0..token_len).map(|_| rng.gen()).collect();
    Ok(format!(
        "stream seed: {}\ntime token detected: {}\nrandom token detected: {}",
        seed,
        is_mt_token(&token),
        is_mt_token(&random)
    ))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    println!("ex17:\n{}", ex17()?);
    println!("ex18:\n{}", ex18()?);
    println!("ex19:\n{}", ex19(args.lines)?);
    println!("ex21:\n{}", ex21()?);
    println!("ex22:\n{}", ex22(args.window)?);
    println!("ex23:\n{}", ex23()?);
    println!("ex24:\n{}", ex24(args.token_len)?);
    Ok(())
}
