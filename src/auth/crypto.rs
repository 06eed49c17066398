//! NTLM one-way functions and challenge responses ([MS-NLMP] 3.3).
//!
//! Pure functions over the RustCrypto primitives; validated against the
//! [MS-NLMP] 4.2 test vectors.

use des::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use des::Des;
use hmac::{Hmac, Mac};
use md4::{Digest as _, Md4};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// The constant plaintext of the LM hash.
const LM_MAGIC: [u8; 8] = *b"KGS!@#$%";

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Spreads 7 key bytes over 8, leaving the DES parity bits clear.
fn des_key_from_7_bytes(key: &[u8]) -> [u8; 8] {
    debug_assert_eq!(key.len(), 7);
    [
        key[0],
        (key[0] << 7) | (key[1] >> 1),
        (key[1] << 6) | (key[2] >> 2),
        (key[2] << 5) | (key[3] >> 3),
        (key[3] << 4) | (key[4] >> 4),
        (key[4] << 3) | (key[5] >> 5),
        (key[5] << 2) | (key[6] >> 6),
        key[6] << 1,
    ]
}

fn des_encrypt(key7: &[u8], data: &[u8; 8]) -> [u8; 8] {
    let key = des_key_from_7_bytes(key7);
    let cipher = Des::new(GenericArray::from_slice(&key));
    let mut block = GenericArray::clone_from_slice(data);
    cipher.encrypt_block(&mut block);
    block.into()
}

/// `DESL`: the data DES-encrypted under each third of the
/// zero-padded 16-byte key ([MS-NLMP] 6).
fn desl(key: &[u8; 16], data: &[u8; 8]) -> [u8; 24] {
    let mut padded = [0u8; 21];
    padded[..16].copy_from_slice(key);
    let mut out = [0u8; 24];
    out[..8].copy_from_slice(&des_encrypt(&padded[0..7], data));
    out[8..16].copy_from_slice(&des_encrypt(&padded[7..14], data));
    out[16..].copy_from_slice(&des_encrypt(&padded[14..21], data));
    out
}

fn hmac_md5(key: &[u8], data: &[u8]) -> [u8; 16] {
    let mut mac = <HmacMd5 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// `NTOWFv1`: MD4 over the UTF-16LE password.
pub fn nt_owf_v1(password: &str) -> [u8; 16] {
    let mut hasher = Md4::new();
    hasher.update(utf16le(password));
    hasher.finalize().into()
}

/// `LMOWFv1`: DES of a well-known constant under the uppercased,
/// 14-byte-padded password halves.
pub fn lm_owf_v1(password: &str) -> [u8; 16] {
    let mut key = [0u8; 14];
    for (i, b) in password
        .to_uppercase()
        .bytes()
        .take(14)
        .enumerate()
    {
        key[i] = b;
    }
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&des_encrypt(&key[..7], &LM_MAGIC));
    out[8..].copy_from_slice(&des_encrypt(&key[7..], &LM_MAGIC));
    out
}

pub fn lm_v1_response(lm_hash: &[u8; 16], server_challenge: &[u8; 8]) -> [u8; 24] {
    desl(lm_hash, server_challenge)
}

pub fn ntlm_v1_response(nt_hash: &[u8; 16], server_challenge: &[u8; 8]) -> [u8; 24] {
    desl(nt_hash, server_challenge)
}

/// NTLMv1 with extended session security: the response binds both
/// challenges through MD5.
pub fn ntlm_v1_ess_response(
    nt_hash: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
) -> [u8; 24] {
    let mut hasher = Md5::new();
    hasher.update(server_challenge);
    hasher.update(client_challenge);
    let digest: [u8; 16] = hasher.finalize().into();
    desl(nt_hash, digest[..8].try_into().expect("8-byte slice"))
}

/// `NTOWFv2`: keyed over the uppercased user name and the (case-kept)
/// domain.
pub fn ntlm_v2_hash(password: &str, user: &str, domain: &str) -> [u8; 16] {
    let key = nt_owf_v1(password);
    hmac_md5(&key, &utf16le(&(user.to_uppercase() + domain)))
}

/// `LMv2`: proof over both challenges, with the client challenge echoed.
pub fn lm_v2_response(
    v2_hash: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
) -> [u8; 24] {
    let mut concat = [0u8; 16];
    concat[..8].copy_from_slice(server_challenge);
    concat[8..].copy_from_slice(client_challenge);
    let proof = hmac_md5(v2_hash, &concat);
    let mut out = [0u8; 24];
    out[..16].copy_from_slice(&proof);
    out[16..].copy_from_slice(client_challenge);
    out
}

/// The NTLMv2 proof over the server challenge and the client blob
/// (`temp`). The full NtChallengeResponse is `proof ∥ temp`.
pub fn ntlm_v2_proof(v2_hash: &[u8; 16], server_challenge: &[u8; 8], temp: &[u8]) -> [u8; 16] {
    let mut data = Vec::with_capacity(8 + temp.len());
    data.extend_from_slice(server_challenge);
    data.extend_from_slice(temp);
    hmac_md5(v2_hash, &data)
}

/// `SessionBaseKey` for NTLMv2.
pub fn session_base_key_v2(v2_hash: &[u8; 16], proof: &[u8; 16]) -> [u8; 16] {
    hmac_md5(v2_hash, proof)
}

/// `SessionBaseKey` for NTLMv1: MD4 of the NT hash.
pub fn session_base_key_v1(nt_hash: &[u8; 16]) -> [u8; 16] {
    let mut hasher = Md4::new();
    hasher.update(nt_hash);
    hasher.finalize().into()
}
