//! NTLM authentication ([MS-NLMP]), carried raw in the SMB1
//! pre-extended-security path and inside SPNEGO everywhere else.

pub mod crypto;
pub mod messages;
pub mod spnego;

use crate::packets::binrw_util::prelude::FileTime;

/// The NTLM variant used to answer the server challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    NtlmV1,
    NtlmV1ExtendedSessionSecurity,
    NtlmV2,
}

/// Credentials plus the local machine identity threaded into NTLMv2
/// target information.
#[derive(Debug, Clone)]
pub struct NtlmCredentials {
    pub domain: String,
    pub user: String,
    pub password: String,
    pub machine_name: String,
}

/// The LM/NT response pair for one authentication.
pub struct NtlmResponses {
    pub lm_response: Vec<u8>,
    pub nt_response: Vec<u8>,
    pub session_base_key: [u8; 16],
}

/// Computes the challenge responses for `method` against a raw server
/// challenge. Shared by the SMB1 pre-extended path and the SPNEGO
/// authenticate leg.
pub fn compute_responses(
    creds: &NtlmCredentials,
    method: AuthMethod,
    server_challenge: &[u8; 8],
    timestamp: FileTime,
) -> NtlmResponses {
    match method {
        AuthMethod::NtlmV1 => {
            let nt_hash = crypto::nt_owf_v1(&creds.password);
            let lm_hash = crypto::lm_owf_v1(&creds.password);
            NtlmResponses {
                lm_response: crypto::lm_v1_response(&lm_hash, server_challenge).to_vec(),
                nt_response: crypto::ntlm_v1_response(&nt_hash, server_challenge).to_vec(),
                session_base_key: crypto::session_base_key_v1(&nt_hash),
            }
        }
        AuthMethod::NtlmV1ExtendedSessionSecurity => {
            let nt_hash = crypto::nt_owf_v1(&creds.password);
            let client_challenge = messages::generate_client_challenge();
            let mut lm_response = [0u8; 24];
            lm_response[..8].copy_from_slice(&client_challenge);
            NtlmResponses {
                lm_response: lm_response.to_vec(),
                nt_response: crypto::ntlm_v1_ess_response(
                    &nt_hash,
                    server_challenge,
                    &client_challenge,
                )
                .to_vec(),
                session_base_key: crypto::session_base_key_v1(&nt_hash),
            }
        }
        AuthMethod::NtlmV2 => {
            let v2_hash = crypto::ntlm_v2_hash(&creds.password, &creds.user, &creds.domain);
            let client_challenge = messages::generate_client_challenge();
            let temp = messages::ntlm_v2_client_challenge(
                timestamp,
                &client_challenge,
                &creds.domain,
                &creds.machine_name,
            );
            let proof = crypto::ntlm_v2_proof(&v2_hash, server_challenge, &temp);
            let mut nt_response = proof.to_vec();
            nt_response.extend_from_slice(&temp);
            NtlmResponses {
                lm_response: crypto::lm_v2_response(
                    &v2_hash,
                    server_challenge,
                    &client_challenge,
                )
                .to_vec(),
                nt_response,
                session_base_key: crypto::session_base_key_v2(&v2_hash, &proof),
            }
        }
    }
}

/// Drives the two-leg SPNEGO/NTLM exchange used by extended security.
pub struct NtlmContext {
    creds: NtlmCredentials,
    method: AuthMethod,
    session_key: Option<[u8; 16]>,
}

impl NtlmContext {
    pub fn new(creds: NtlmCredentials, method: AuthMethod) -> Self {
        Self {
            creds,
            method,
            session_key: None,
        }
    }

    /// The SPNEGO-wrapped NEGOTIATE token, or `None` when the server's
    /// mechanism hint rules NTLM out (the caller surfaces
    /// `SEC_E_INVALID_TOKEN`).
    pub fn negotiate_token(&self, server_hint: &[u8]) -> crate::Result<Option<Vec<u8>>> {
        if !spnego::accepts_ntlm(server_hint) {
            return Ok(None);
        }
        let negotiate = messages::NtlmNegotiateMessage::new().encode()?;
        Ok(Some(spnego::wrap_negotiate(&negotiate)?))
    }

    /// The SPNEGO-wrapped AUTHENTICATE token answering the server's
    /// challenge leg, or `None` when the blob does not carry a usable
    /// CHALLENGE message.
    pub fn authenticate_token(&mut self, challenge_blob: &[u8]) -> crate::Result<Option<Vec<u8>>> {
        let Some(ntlm_challenge) = spnego::unwrap_response(challenge_blob).unwrap_or(None) else {
            return Ok(None);
        };
        let Ok(challenge) = messages::NtlmChallengeMessage::decode(&ntlm_challenge) else {
            return Ok(None);
        };

        let responses = compute_responses(
            &self.creds,
            self.method,
            &challenge.server_challenge,
            FileTime::now(),
        );
        self.session_key = Some(responses.session_base_key);

        let authenticate = messages::NtlmAuthenticateMessage::new(
            &self.creds.domain,
            &self.creds.user,
            &self.creds.machine_name,
            responses.lm_response,
            responses.nt_response,
        )
        .encode()?;
        Ok(Some(spnego::wrap_authenticate(&authenticate)?))
    }

    /// The NTLM session base key, once the authenticate leg was built.
    pub fn session_key(&self) -> Option<&[u8; 16]> {
        self.session_key.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> NtlmCredentials {
        NtlmCredentials {
            domain: "DOM".to_string(),
            user: "user".to_string(),
            password: "pw".to_string(),
            machine_name: "WS01".to_string(),
        }
    }

    #[test]
    fn test_context_two_leg_exchange() {
        let mut context = NtlmContext::new(creds(), AuthMethod::NtlmV2);
        let hint = spnego::build_negotiate_hint().unwrap();
        let negotiate = context.negotiate_token(&hint).unwrap().unwrap();
        assert!(!negotiate.is_empty());

        let challenge = messages::NtlmChallengeMessage::new([7; 8], vec![], vec![]);
        let challenge_blob = spnego::wrap_challenge(&challenge.encode().unwrap()).unwrap();
        let authenticate = context.authenticate_token(&challenge_blob).unwrap().unwrap();
        assert!(!authenticate.is_empty());
        assert!(context.session_key().is_some());

        // The authenticate token unwraps back to an NTLM type-3 message.
        let inner = spnego::unwrap_response(&authenticate).unwrap().unwrap();
        let parsed = messages::NtlmAuthenticateMessage::decode(&inner).unwrap();
        assert_eq!(parsed.lm_response.len(), 24);
        assert!(parsed.nt_response.len() > 16);
    }

    #[test]
    fn test_garbage_challenge_declines_token() {
        let mut context = NtlmContext::new(creds(), AuthMethod::NtlmV2);
        assert!(context
            .authenticate_token(&[0x11, 0x22, 0x33])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_v1_ess_lm_field_carries_client_challenge() {
        let responses = compute_responses(
            &creds(),
            AuthMethod::NtlmV1ExtendedSessionSecurity,
            &[1; 8],
            0.into(),
        );
        assert_eq!(responses.lm_response.len(), 24);
        assert_eq!(&responses.lm_response[8..], &[0u8; 16]);
        assert_eq!(responses.nt_response.len(), 24);
    }
}
