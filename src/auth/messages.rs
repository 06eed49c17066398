//! NTLMSSP message codecs ([MS-NLMP] 2.2): NEGOTIATE, CHALLENGE and
//! AUTHENTICATE, plus the NTLMv2 client-challenge blob. Offsets are
//! message-relative; messages serialize standalone, so stream positions
//! are the offsets.

use binrw::prelude::*;
use modular_bitfield::prelude::*;
use rand::{rngs::OsRng, Rng};

use crate::packets::binrw_util::prelude::*;

#[bitfield]
#[derive(BinRead, BinWrite, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct NegotiateFlags {
    pub unicode: bool,
    pub oem: bool,
    pub request_target: bool,
    #[skip]
    __: B1,
    pub sign: bool,
    pub seal: bool,
    pub datagram: bool,
    pub lm_key: bool,
    #[skip]
    __: B1,
    pub ntlm: bool,
    #[skip]
    __: B1,
    pub anonymous: bool,
    pub oem_domain_supplied: bool,
    pub oem_workstation_supplied: bool,
    #[skip]
    __: B1,
    pub always_sign: bool,
    pub target_type_domain: bool,
    pub target_type_server: bool,
    #[skip]
    __: B1,
    pub extended_session_security: bool,
    pub identify: bool,
    #[skip]
    __: B1,
    pub request_non_nt_session_key: bool,
    pub target_info: bool,
    #[skip]
    __: B1,
    pub version: bool,
    #[skip]
    __: B3,
    pub key128: bool,
    pub key_exchange: bool,
    pub key56: bool,
}

impl NegotiateFlags {
    /// The flag set this client opens with.
    pub fn client_defaults() -> Self {
        NegotiateFlags::new()
            .with_unicode(true)
            .with_oem(true)
            .with_request_target(true)
            .with_ntlm(true)
            .with_always_sign(true)
            .with_extended_session_security(true)
            .with_target_info(true)
            .with_key128(true)
            .with_key56(true)
    }
}

/// A `(length, max-length, offset)` reference into the message payload.
/// Written as placeholders and patched once the payload lands.
#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct FieldRef {
    length: PosMarker<u16>,
    max_length: PosMarker<u16>,
    offset: PosMarker<u32>,
}

/// Lays a payload field down at the current position and patches its
/// reference block.
#[binrw::writer(writer, endian)]
fn write_payload(data: &Vec<u8>, field: &FieldRef) -> BinResult<()> {
    field
        .offset
        .write_back(writer.stream_position()?, writer, endian)?;
    field.length.write_back(data.len() as u64, writer, endian)?;
    field.max_length.write_back(data.len() as u64, writer, endian)?;
    data.write_options(writer, endian, ())
}

fn payload_args(field: &FieldRef) -> (u64, usize) {
    (field.offset.value as u64, field.length.value as usize)
}

#[binrw::parser(reader)]
fn read_payload(field_args: (u64, usize)) -> BinResult<Vec<u8>> {
    let (offset, length) = field_args;
    reader.seek(std::io::SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; length];
    reader.read_exact(&mut buf).map_err(binrw::Error::from)?;
    Ok(buf)
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(magic(b"NTLMSSP\0"), little)]
pub struct NtlmNegotiateMessage {
    #[bw(calc = 1)]
    #[br(assert(_message_type == 1))]
    _message_type: u32,
    pub flags: NegotiateFlags,
    /// Domain and workstation are not supplied; their references are
    /// zero.
    #[bw(calc = [0; 8])]
    _domain_fields: [u8; 8],
    #[bw(calc = [0; 8])]
    _workstation_fields: [u8; 8],
}

impl NtlmNegotiateMessage {
    pub fn new() -> Self {
        Self {
            flags: NegotiateFlags::client_defaults(),
        }
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}

impl Default for NtlmNegotiateMessage {
    fn default() -> Self {
        Self::new()
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(magic(b"NTLMSSP\0"), little)]
pub struct NtlmChallengeMessage {
    #[bw(calc = 2)]
    #[br(assert(_message_type == 2))]
    _message_type: u32,
    target_name_ref: FieldRef,
    pub flags: NegotiateFlags,
    pub server_challenge: [u8; 8],
    #[bw(calc = 0)]
    _reserved: u64,
    target_info_ref: FieldRef,
    #[br(parse_with = read_payload, args(payload_args(&target_name_ref)))]
    #[bw(write_with = write_payload, args(target_name_ref))]
    pub target_name: Vec<u8>,
    #[br(parse_with = read_payload, args(payload_args(&target_info_ref)))]
    #[bw(write_with = write_payload, args(target_info_ref))]
    pub target_info: Vec<u8>,
}

impl NtlmChallengeMessage {
    pub fn new(server_challenge: [u8; 8], target_name: Vec<u8>, target_info: Vec<u8>) -> Self {
        Self {
            flags: NegotiateFlags::client_defaults()
                .with_target_type_domain(true),
            server_challenge,
            target_name,
            target_info,
            target_name_ref: FieldRef::default(),
            target_info_ref: FieldRef::default(),
        }
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        Ok(Self::read(&mut std::io::Cursor::new(data))?)
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(magic(b"NTLMSSP\0"), little)]
pub struct NtlmAuthenticateMessage {
    #[bw(calc = 3)]
    #[br(assert(_message_type == 3))]
    _message_type: u32,
    lm_ref: FieldRef,
    nt_ref: FieldRef,
    domain_ref: FieldRef,
    user_ref: FieldRef,
    workstation_ref: FieldRef,
    session_key_ref: FieldRef,
    pub flags: NegotiateFlags,
    #[br(parse_with = read_payload, args(payload_args(&domain_ref)))]
    #[bw(write_with = write_payload, args(domain_ref))]
    pub domain: Vec<u8>,
    #[br(parse_with = read_payload, args(payload_args(&user_ref)))]
    #[bw(write_with = write_payload, args(user_ref))]
    pub user: Vec<u8>,
    #[br(parse_with = read_payload, args(payload_args(&workstation_ref)))]
    #[bw(write_with = write_payload, args(workstation_ref))]
    pub workstation: Vec<u8>,
    #[br(parse_with = read_payload, args(payload_args(&lm_ref)))]
    #[bw(write_with = write_payload, args(lm_ref))]
    pub lm_response: Vec<u8>,
    #[br(parse_with = read_payload, args(payload_args(&nt_ref)))]
    #[bw(write_with = write_payload, args(nt_ref))]
    pub nt_response: Vec<u8>,
    #[br(parse_with = read_payload, args(payload_args(&session_key_ref)))]
    #[bw(write_with = write_payload, args(session_key_ref))]
    pub encrypted_session_key: Vec<u8>,
}

impl NtlmAuthenticateMessage {
    pub fn new(
        domain: &str,
        user: &str,
        workstation: &str,
        lm_response: Vec<u8>,
        nt_response: Vec<u8>,
    ) -> Self {
        fn utf16le(s: &str) -> Vec<u8> {
            s.encode_utf16().flat_map(u16::to_le_bytes).collect()
        }
        Self {
            flags: NegotiateFlags::client_defaults(),
            domain: utf16le(domain),
            user: utf16le(user),
            workstation: utf16le(workstation),
            lm_response,
            nt_response,
            encrypted_session_key: vec![],
            lm_ref: FieldRef::default(),
            nt_ref: FieldRef::default(),
            domain_ref: FieldRef::default(),
            user_ref: FieldRef::default(),
            workstation_ref: FieldRef::default(),
            session_key_ref: FieldRef::default(),
        }
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        Ok(Self::read(&mut std::io::Cursor::new(data))?)
    }
}

/// NTLMv2 attribute/value pair identifiers ([MS-NLMP] 2.2.2.1).
pub const AV_EOL: u16 = 0x0000;
pub const AV_NB_COMPUTER_NAME: u16 = 0x0001;
pub const AV_NB_DOMAIN_NAME: u16 = 0x0002;

fn av_pair(id: u16, value: &str) -> Vec<u8> {
    let encoded: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let mut out = Vec::with_capacity(4 + encoded.len());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(encoded.len() as u16).to_le_bytes());
    out.extend_from_slice(&encoded);
    out
}

/// The `temp` blob of an NTLMv2 response ([MS-NLMP] 3.3.2): versions,
/// timestamp, client challenge, and the AV pairs naming the domain and
/// this machine.
pub fn ntlm_v2_client_challenge(
    timestamp: FileTime,
    client_challenge: &[u8; 8],
    domain: &str,
    machine_name: &str,
) -> Vec<u8> {
    let mut blob = vec![0x01, 0x01, 0, 0, 0, 0, 0, 0];
    blob.extend_from_slice(&timestamp.to_le_bytes());
    blob.extend_from_slice(client_challenge);
    blob.extend_from_slice(&[0; 4]);
    blob.extend_from_slice(&av_pair(AV_NB_DOMAIN_NAME, domain));
    blob.extend_from_slice(&av_pair(AV_NB_COMPUTER_NAME, machine_name));
    blob.extend_from_slice(&AV_EOL.to_le_bytes());
    blob.extend_from_slice(&0u16.to_le_bytes());
    blob.extend_from_slice(&[0; 4]);
    blob
}

/// A fresh 8-byte client challenge.
pub fn generate_client_challenge() -> [u8; 8] {
    let mut challenge = [0u8; 8];
    OsRng.fill(&mut challenge);
    challenge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_message_layout() {
        let encoded = NtlmNegotiateMessage::new().encode().unwrap();
        assert_eq!(&encoded[..8], b"NTLMSSP\0");
        assert_eq!(encoded[8], 1);
        assert_eq!(encoded.len(), 32);
    }

    #[test]
    fn test_challenge_round_trip() {
        let challenge = NtlmChallengeMessage::new(
            [1, 2, 3, 4, 5, 6, 7, 8],
            "DOMAIN".encode_utf16().flat_map(u16::to_le_bytes).collect(),
            av_pair(AV_NB_DOMAIN_NAME, "DOMAIN"),
        );
        let encoded = challenge.encode().unwrap();
        let parsed = NtlmChallengeMessage::decode(&encoded).unwrap();
        assert_eq!(parsed.server_challenge, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(parsed.target_info, av_pair(AV_NB_DOMAIN_NAME, "DOMAIN"));
    }

    #[test]
    fn test_authenticate_round_trip() {
        let message = NtlmAuthenticateMessage::new(
            "DOM",
            "user",
            "WS01",
            vec![0xAA; 24],
            vec![0xBB; 48],
        );
        let encoded = message.encode().unwrap();
        let parsed = NtlmAuthenticateMessage::decode(&encoded).unwrap();
        assert_eq!(parsed.lm_response, vec![0xAA; 24]);
        assert_eq!(parsed.nt_response, vec![0xBB; 48]);
        assert_eq!(
            String::from_utf16(
                &parsed
                    .user
                    .chunks(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect::<Vec<_>>()
            )
            .unwrap(),
            "user"
        );
    }

    #[test]
    fn test_client_challenge_blob_matches_reference_shape() {
        let blob = ntlm_v2_client_challenge(0.into(), &[0xaa; 8], "Domain", "Server");
        // Version prefix, zero time, challenge, reserved.
        assert_eq!(&blob[..8], &[1, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&blob[8..16], &[0; 8]);
        assert_eq!(&blob[16..24], &[0xaa; 8]);
        // Domain pair first, per the reference vectors.
        assert_eq!(&blob[28..32], &[0x02, 0x00, 0x0c, 0x00]);
    }
}
