//! SPNEGO token wrapping ([RFC 4178]) around the NTLM messages, built on
//! the `gss-api` and `der` crates.

use der::asn1::OctetStringRef;
use der::oid::ObjectIdentifier;
use der::{AnyRef, Decode, Encode};
use gss_api::negotiation::{NegState, NegTokenInit2, NegTokenResp, NegotiationToken};
use gss_api::InitialContextToken;

use crate::Error;

pub const SPNEGO_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.2");
pub const NTLM_MECH_TYPE_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.2.10");

/// Checks the server's negotiate hint: it must be an SPNEGO initial
/// token whose mechanism list offers NTLM. An empty hint is accepted —
/// some servers send none and still talk raw SPNEGO.
pub fn accepts_ntlm(hint: &[u8]) -> bool {
    if hint.is_empty() {
        return true;
    }
    let Ok(token) = InitialContextToken::from_der(hint) else {
        return false;
    };
    if token.this_mech != SPNEGO_OID {
        return false;
    }
    let Ok(der_of_inner) = token.inner_context_token.to_der() else {
        return false;
    };
    let Ok(NegotiationToken::NegTokenInit2(init)) = NegotiationToken::from_der(&der_of_inner)
    else {
        return false;
    };
    init.mech_types
        .map(|types| types.iter().any(|oid| oid == &NTLM_MECH_TYPE_OID))
        .unwrap_or(false)
}

/// Wraps the NTLM NEGOTIATE message into the SPNEGO initial token.
pub fn wrap_negotiate(ntlm_token: &[u8]) -> crate::Result<Vec<u8>> {
    let inner = NegotiationToken::NegTokenInit2(NegTokenInit2 {
        mech_types: Some(vec![NTLM_MECH_TYPE_OID]),
        req_flags: None,
        mech_token: Some(OctetStringRef::new(ntlm_token)?),
        neg_hints: None,
        mech_list_mic: None,
    });
    let inner_der = inner.to_der()?;
    let token = InitialContextToken {
        this_mech: SPNEGO_OID,
        inner_context_token: AnyRef::from_der(&inner_der)?,
    };
    Ok(token.to_der()?)
}

/// Wraps the NTLM AUTHENTICATE message into an SPNEGO response token.
pub fn wrap_authenticate(ntlm_token: &[u8]) -> crate::Result<Vec<u8>> {
    let token = NegotiationToken::NegTokenResp(NegTokenResp {
        neg_state: None,
        supported_mech: Some(NTLM_MECH_TYPE_OID),
        response_token: Some(OctetStringRef::new(ntlm_token)?),
        mech_list_mic: None,
    });
    Ok(token.to_der()?)
}

/// Builds the server-side challenge leg (accept-incomplete). Used by the
/// in-process test servers.
pub fn wrap_challenge(ntlm_token: &[u8]) -> crate::Result<Vec<u8>> {
    let token = NegotiationToken::NegTokenResp(NegTokenResp {
        neg_state: Some(NegState::AcceptIncomplete),
        supported_mech: Some(NTLM_MECH_TYPE_OID),
        response_token: Some(OctetStringRef::new(ntlm_token)?),
        mech_list_mic: None,
    });
    Ok(token.to_der()?)
}

/// Unwraps an SPNEGO response token, yielding the inner mechanism token
/// if one is present.
pub fn unwrap_response(blob: &[u8]) -> crate::Result<Option<Vec<u8>>> {
    let token = NegotiationToken::from_der(blob)
        .map_err(|_| Error::InvalidMessage("malformed SPNEGO response token".into()))?;
    let NegotiationToken::NegTokenResp(resp) = token else {
        return Err(Error::InvalidMessage(
            "unexpected SPNEGO token in response position".into(),
        ));
    };
    Ok(resp.response_token.map(|t| t.as_bytes().to_vec()))
}

/// Builds the server's initial mechanism hint (the blob carried by
/// negotiate responses). Used by the in-process test servers.
pub fn build_negotiate_hint() -> crate::Result<Vec<u8>> {
    let inner = NegotiationToken::NegTokenInit2(NegTokenInit2 {
        mech_types: Some(vec![NTLM_MECH_TYPE_OID]),
        req_flags: None,
        mech_token: None,
        neg_hints: None,
        mech_list_mic: None,
    });
    let inner_der = inner.to_der()?;
    let token = InitialContextToken {
        this_mech: SPNEGO_OID,
        inner_context_token: AnyRef::from_der(&inner_der)?,
    };
    Ok(token.to_der()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_hint_round_trip() {
        let hint = build_negotiate_hint().unwrap();
        assert!(accepts_ntlm(&hint));
        assert!(accepts_ntlm(&[]));
        assert!(!accepts_ntlm(&[0x30, 0x03, 0x02, 0x01, 0x00]));
    }

    #[test]
    fn test_wrap_unwrap_round_trip() {
        let ntlm = b"NTLMSSP\0fake-token";
        let challenge = wrap_challenge(ntlm).unwrap();
        let unwrapped = unwrap_response(&challenge).unwrap().unwrap();
        assert_eq!(unwrapped, ntlm);

        let authenticate = wrap_authenticate(ntlm).unwrap();
        let unwrapped = unwrap_response(&authenticate).unwrap().unwrap();
        assert_eq!(unwrapped, ntlm);

        // The initial token is an InitialContextToken, not a NegTokenResp.
        let initial = wrap_negotiate(ntlm).unwrap();
        assert!(unwrap_response(&initial).is_err());
        assert!(accepts_ntlm(&initial) || InitialContextToken::from_der(&initial).is_ok());
    }
}
