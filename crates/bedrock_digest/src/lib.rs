#![deny(missing_docs)]

//! Utility functions for computing hashes using the
//! [RustCrypto/hashes](https://github.com/RustCrypto/hashes) family of crates.
//!
//! Anything that implements the [`Digest`] trait can be driven through
//! [`compute_bytes_digest`] and [`compute_file_digest`]. On top of the plain
//! digests the crate provides the *strong file hash*: a framed composition of
//! per-block digest pairs and a length suffix that stays stable regardless of
//! how the underlying hash implementations buffer their input.
//!
//! # Examples
//!
//! ```
//! use bedrock_digest::{sha256_hex, strong_hash_bytes};
//!
//! assert_eq!(
//!     sha256_hex("The quick brown fox jumps over the lazy dog"),
//!     "d7a8fbb307d7809469ca9abcb0082e4f8d5651e46d3cdb762d02d0bf37c9e592"
//! );
//! assert_eq!(
//!     strong_hash_bytes("The quick brown fox jumps over the lazy dog"),
//!     "d7dd023e2e8f7b9b5df806ddacfa7510fcd441202399c7896960876f17610fe6"
//! );
//! ```

pub use digest;

use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use digest::{Digest, Output};

pub use blake2::Blake2b512;
pub use sha2::Sha256;
pub use sha3::Sha3_256;

/// A type alias for the output of a SHA-256 hash.
pub type Sha256Hash = sha2::digest::Output<Sha256>;

/// A type alias for the output of a SHA-3-256 hash.
pub type Sha3_256Hash = sha3::digest::Output<Sha3_256>;

/// A type alias for the output of a BLAKE2b-512 hash.
pub type Blake2b512Hash = blake2::digest::Output<Blake2b512>;

/// The block size used when framing input for the strong file hash.
const STRONG_HASH_BLOCK_SIZE: usize = 1024 * 1024;

/// The tag prepended to strong hashes computed with the blake2b+sha3 pair.
const BLAKE2B_SHA3_TAG: &str = "3_2$";

/// Compute a hash of the specified bytes.
pub fn compute_bytes_digest<D: Digest + Default>(bytes: impl AsRef<[u8]>) -> Output<D> {
    let mut hasher = D::default();
    hasher.update(bytes);
    hasher.finalize()
}

/// Compute a hash of the file at the specified location.
pub fn compute_file_digest<D: Digest + Default>(
    path: impl AsRef<Path>,
) -> Result<Output<D>, std::io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = Wrapper::<D>::default();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.0.finalize())
}

/// Adapts any [`Digest`] to [`std::io::Write`] so files can be streamed into it.
#[derive(Default)]
struct Wrapper<D: Digest>(D);

impl<D: Digest> std::io::Write for Wrapper<D> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Encodes a digest output as a lowercase hex string.
fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Computes the SHA-256 digest of `bytes` as a lowercase hex string.
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    to_hex(&compute_bytes_digest::<Sha256>(bytes))
}

/// Computes the SHA-3-256 digest of `bytes` as a lowercase hex string.
pub fn sha3_256_hex(bytes: impl AsRef<[u8]>) -> String {
    to_hex(&compute_bytes_digest::<Sha3_256>(bytes))
}

/// Computes the BLAKE2b-512 digest of `bytes` as a lowercase hex string.
pub fn blake2b_512_hex(bytes: impl AsRef<[u8]>) -> String {
    to_hex(&compute_bytes_digest::<Blake2b512>(bytes))
}

/// Parses a hex string back into a digest output. Returns `None` when the
/// string is not valid hex of exactly the right length.
pub fn parse_digest_from_hex<D: Digest>(str: &str) -> Option<Output<D>> {
    let mut hash = <Output<D>>::default();
    match hex::decode_to_slice(str, &mut hash) {
        Ok(_) => Some(hash),
        Err(_) => None,
    }
}

/// Computes the strong hash of a reader with a known total length.
///
/// The input is consumed in fixed-size blocks; an empty input still
/// contributes a single empty block, which is why the empty-input hash is
/// well defined. Every block is digested together with the decimal string of
/// the total length, the per-block digest pairs are concatenated, the length
/// is appended once more and the result is digested with the finishing
/// algorithm.
fn strong_hash_framed<DA, DB, DF>(
    mut reader: impl Read,
    len: u64,
    tag: &str,
) -> Result<String, std::io::Error>
where
    DA: Digest + Default,
    DB: Digest + Default,
    DF: Digest + Default,
{
    let suffix = len.to_string();
    let mut buf = vec![0u8; STRONG_HASH_BLOCK_SIZE.min(len.max(1) as usize)];
    let mut acc = String::new();
    let mut remaining = len;
    let mut first = true;

    while first || remaining > 0 {
        first = false;
        let want = remaining.min(STRONG_HASH_BLOCK_SIZE as u64) as usize;
        reader.read_exact(&mut buf[..want])?;
        remaining -= want as u64;

        let mut a = DA::default();
        a.update(&buf[..want]);
        a.update(suffix.as_bytes());
        let mut b = DB::default();
        b.update(&buf[..want]);
        b.update(suffix.as_bytes());

        let _ = write!(acc, "{}{}", to_hex(&a.finalize()), to_hex(&b.finalize()));
    }

    acc.push_str(&suffix);
    Ok(format!("{tag}{}", to_hex(&compute_bytes_digest::<DF>(acc))))
}

/// Computes the strong hash of a byte slice using the default
/// SHA-256 + SHA-3-256 block pair finished with SHA-3-256.
pub fn strong_hash_bytes(bytes: impl AsRef<[u8]>) -> String {
    let bytes = bytes.as_ref();
    strong_hash_framed::<Sha256, Sha3_256, Sha3_256>(bytes, bytes.len() as u64, "")
        .expect("in-memory reads cannot fail")
}

/// Computes the strong hash of a byte slice with the SHA-3-256 + BLAKE2b-512
/// block pair finished with BLAKE2b-512. The result carries the `3_2$` tag so
/// parsers can tell the variants apart.
pub fn strong_hash_bytes_blake2b_sha3(bytes: impl AsRef<[u8]>) -> String {
    let bytes = bytes.as_ref();
    strong_hash_framed::<Sha3_256, Blake2b512, Blake2b512>(
        bytes,
        bytes.len() as u64,
        BLAKE2B_SHA3_TAG,
    )
    .expect("in-memory reads cannot fail")
}

/// Computes the default strong hash of the file at `path`.
pub fn strong_hash_file(path: impl AsRef<Path>) -> Result<String, std::io::Error> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    strong_hash_framed::<Sha256, Sha3_256, Sha3_256>(file, len, "")
}

/// Computes the tagged blake2b+sha3 strong hash of the file at `path`.
pub fn strong_hash_file_blake2b_sha3(path: impl AsRef<Path>) -> Result<String, std::io::Error> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    strong_hash_framed::<Sha3_256, Blake2b512, Blake2b512>(file, len, BLAKE2B_SHA3_TAG)
}

/// Returns true when `expected` is the strong hash of `bytes`. The hash
/// variant is selected by the presence of the `3_2$` tag.
pub fn matches_strong_hash(bytes: impl AsRef<[u8]>, expected: &str) -> bool {
    if expected.starts_with(BLAKE2B_SHA3_TAG) {
        strong_hash_bytes_blake2b_sha3(bytes) == expected
    } else {
        strong_hash_bytes(bytes) == expected
    }
}

/// Returns true when `expected` is the strong hash of the file at `path`.
pub fn matches_strong_file_hash(
    path: impl AsRef<Path>,
    expected: &str,
) -> Result<bool, std::io::Error> {
    Ok(if expected.starts_with(BLAKE2B_SHA3_TAG) {
        strong_hash_file_blake2b_sha3(path)? == expected
    } else {
        strong_hash_file(path)? == expected
    })
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    const FOX: &str = "The quick brown fox jumps over the lazy dog";
    const FOX_DOT: &str = "The quick brown fox jumps over the lazy dog.";

    #[rstest]
    #[case("", "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")]
    #[case("0", "5feceb66ffc86f38d952786c6d696c79c2dbc239dd4e91b46729d73a27fb57e9")]
    #[case(FOX, "d7a8fbb307d7809469ca9abcb0082e4f8d5651e46d3cdb762d02d0bf37c9e592")]
    #[case(FOX_DOT, "ef537f25c895bfa782526529a9b63d97aa631564d5d789c2b765448c8635fb6c")]
    fn sha256(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sha256_hex(input), expected);
    }

    #[rstest]
    #[case("", "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a")]
    #[case("0", "f9e2eaaa42d9fe9e558a9b8ef1bf366f190aacaa83bad2641ee106e9041096e4")]
    #[case(FOX, "69070dda01975c8c120c3aada1b282394e7f032fa9cf32f4cb2259a0897dfc04")]
    #[case(FOX_DOT, "a80f839cd4f83f6c3dafc87feae470045e4eb0d366397d5c6ce34ba1739f734d")]
    fn sha3_256(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sha3_256_hex(input), expected);
    }

    #[rstest]
    #[case(
        "",
        "786a02f742015903c6c6fd852552d272912f4740e15847618a86e217f71f5419\
         d25e1031afee585313896444934eb04b903a685b1448b755d56f701afe9be2ce"
    )]
    #[case(
        FOX,
        "a8add4bdddfd93e4877d2746e62817b116364a1fa7bc148d95090bc7333b3673\
         f82401cf7aa2e4cb1ecd90296e3f14cb5413f8ed77be73045b13914cdcd6a918"
    )]
    fn blake2b_512(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(blake2b_512_hex(input), expected);
    }

    #[test]
    fn strong_hash_empty_input() {
        // One empty block framed with "0", finished with another "0".
        let per_block = format!("{}{}", sha256_hex("0"), sha3_256_hex("0"));
        let expected = sha3_256_hex(format!("{per_block}0"));
        assert_eq!(expected, "539e660d5e7d3245469e151f0c106ae2ac108a681f5083ac61f52381766aff3c");
        assert_eq!(strong_hash_bytes(""), expected);
    }

    #[rstest]
    #[case(FOX, "d7dd023e2e8f7b9b5df806ddacfa7510fcd441202399c7896960876f17610fe6")]
    #[case(FOX_DOT, "853af62ed82f1c9079c2a1ee3f28806a520dc48fb702091e8f375466d7c484c0")]
    fn strong_hash_vectors(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strong_hash_bytes(input), expected);
    }

    #[test]
    fn strong_hash_framing_is_observable() {
        // The framed input of a single-block hash can be reproduced by hand.
        let framed = format!("{FOX}43");
        let acc = format!("{}{}43", sha256_hex(&framed), sha3_256_hex(&framed));
        assert_eq!(strong_hash_bytes(FOX), sha3_256_hex(acc));
    }

    #[test]
    fn strong_hash_blake2b_sha3_variant() {
        let expected = "3_2$38b66d21d113eb60e20941d2ff3aa38f5287f97045a3998be5cefae3686956a6\
                        78afc7b92312d4013d925a50a03d6b57b42619f635445eb070fb42b4ff63a2ee";
        assert_eq!(strong_hash_bytes_blake2b_sha3(FOX_DOT), expected);
        assert!(matches_strong_hash(FOX_DOT, expected));
        assert!(!matches_strong_hash(FOX, expected));
    }

    #[test]
    fn strong_hash_variant_dispatch() {
        assert!(matches_strong_hash(FOX, &strong_hash_bytes(FOX)));
        assert!(!matches_strong_hash(FOX_DOT, &strong_hash_bytes(FOX)));
    }

    #[test]
    fn strong_hash_file_matches_bytes() {
        let temp_dir = tempfile::tempdir().unwrap();
        for content in ["", FOX, FOX_DOT] {
            let path = temp_dir.path().join("data");
            std::fs::write(&path, content).unwrap();
            assert_eq!(strong_hash_file(&path).unwrap(), strong_hash_bytes(content));
            assert_eq!(
                strong_hash_file_blake2b_sha3(&path).unwrap(),
                strong_hash_bytes_blake2b_sha3(content)
            );
            assert!(matches_strong_file_hash(&path, &strong_hash_bytes(content)).unwrap());
        }
    }

    #[test]
    fn strong_hash_multiple_blocks() {
        // 2.5 MiB spans three blocks; determinism and file agreement must hold.
        let data = vec![0xabu8; 5 * 1024 * 1024 / 2];
        assert_eq!(strong_hash_bytes(&data), strong_hash_bytes(&data));

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("large");
        std::fs::write(&path, &data).unwrap();
        assert_eq!(strong_hash_file(&path).unwrap(), strong_hash_bytes(&data));
    }

    #[test]
    fn file_digest_matches_bytes_digest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test");
        std::fs::write(&path, "1234567890").unwrap();
        let hash = compute_file_digest::<Sha256>(&path).unwrap();
        assert_eq!(
            format!("{hash:x}"),
            "c775e7b757ede630cd0aa1113bd102661ab38829ca52a6422ab782862f268646"
        );
        assert_eq!(hash, compute_bytes_digest::<Sha256>("1234567890"));
    }

    #[test]
    fn digest_output_bytes() {
        use hex_literal::hex;
        assert_eq!(
            compute_bytes_digest::<Sha256>(FOX)[..],
            hex!("d7a8fbb307d7809469ca9abcb0082e4f8d5651e46d3cdb762d02d0bf37c9e592")[..]
        );
    }

    #[test]
    fn parse_digest_round_trip() {
        let hash = compute_bytes_digest::<Sha256>(FOX);
        let parsed = parse_digest_from_hex::<Sha256>(&to_hex(&hash)).unwrap();
        assert_eq!(hash, parsed);
        assert!(parse_digest_from_hex::<Sha256>("abc").is_none());
    }
}
