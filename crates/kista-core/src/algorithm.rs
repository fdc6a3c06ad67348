#![forbid(unsafe_code)]

//! Algorithm URI constants.
//!
//! Each constant is the exact string that appears in an `Algorithm`
//! attribute. The role tables at the bottom are the closed sets the
//! registries accept; adding an algorithm means adding it here first.

// ── Canonicalization ─────────────────────────────────────────────────

pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const C14N_WITH_COMMENTS: &str =
    "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const EXC_C14N_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

// ── Digest algorithms ────────────────────────────────────────────────

pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#sha224";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";
pub const SHA3_224: &str = "http://www.w3.org/2007/05/xmldsig-more#sha3-224";
pub const SHA3_256: &str = "http://www.w3.org/2007/05/xmldsig-more#sha3-256";
pub const SHA3_384: &str = "http://www.w3.org/2007/05/xmldsig-more#sha3-384";
pub const SHA3_512: &str = "http://www.w3.org/2007/05/xmldsig-more#sha3-512";
pub const RIPEMD160: &str = "http://www.w3.org/2001/04/xmlenc#ripemd160";

// ── RSA signature algorithms ─────────────────────────────────────────

pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const RSA_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha224";
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";
pub const RSA_RIPEMD160: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-ripemd160";

// ── HMAC signature algorithms ────────────────────────────────────────

pub const HMAC_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#hmac-sha1";
pub const HMAC_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-sha224";
pub const HMAC_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-sha256";
pub const HMAC_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-sha384";
pub const HMAC_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#hmac-sha512";

// ── Block cipher algorithms ──────────────────────────────────────────

pub const AES128_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
pub const AES192_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes192-cbc";
pub const AES256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";
pub const AES128_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
pub const AES192_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes192-gcm";
pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";
pub const TRIPLEDES_CBC: &str = "http://www.w3.org/2001/04/xmlenc#tripledes-cbc";

// ── Key transport algorithms ─────────────────────────────────────────

pub const RSA_PKCS1: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";
pub const RSA_OAEP: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";

// ── Transform algorithms ─────────────────────────────────────────────

pub const BASE64: &str = "http://www.w3.org/2000/09/xmldsig#base64";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
pub const XPATH: &str = "http://www.w3.org/TR/1999/REC-xpath-19991116";
pub const XSLT: &str = "http://www.w3.org/TR/1999/REC-xslt-19991116";

// ── Role tables ──────────────────────────────────────────────────────

pub const DIGEST_ALGORITHMS: &[&str] = &[
    SHA1, SHA224, SHA256, SHA384, SHA512, RIPEMD160, SHA3_224, SHA3_256, SHA3_384, SHA3_512,
];

pub const SIGNATURE_ALGORITHMS: &[&str] = &[
    RSA_SHA1,
    RSA_SHA224,
    RSA_SHA256,
    RSA_SHA384,
    RSA_SHA512,
    RSA_RIPEMD160,
    HMAC_SHA1,
    HMAC_SHA224,
    HMAC_SHA256,
    HMAC_SHA384,
    HMAC_SHA512,
];

pub const KEY_TRANSPORT_ALGORITHMS: &[&str] = &[RSA_PKCS1, RSA_OAEP];

pub const BLOCK_CIPHER_ALGORITHMS: &[&str] = &[
    AES128_CBC,
    AES192_CBC,
    AES256_CBC,
    AES128_GCM,
    AES192_GCM,
    AES256_GCM,
    TRIPLEDES_CBC,
];

pub const C14N_ALGORITHMS: &[&str] = &[C14N, C14N_WITH_COMMENTS, EXC_C14N, EXC_C14N_WITH_COMMENTS];

pub fn is_digest(uri: &str) -> bool {
    DIGEST_ALGORITHMS.contains(&uri)
}

pub fn is_signature(uri: &str) -> bool {
    SIGNATURE_ALGORITHMS.contains(&uri)
}

pub fn is_encryption(uri: &str) -> bool {
    KEY_TRANSPORT_ALGORITHMS.contains(&uri) || BLOCK_CIPHER_ALGORITHMS.contains(&uri)
}

pub fn is_c14n(uri: &str) -> bool {
    C14N_ALGORITHMS.contains(&uri)
}

/// SHA-1 based digests and signatures, which callers may choose to refuse.
pub fn is_sha1_based(uri: &str) -> bool {
    matches!(uri, SHA1 | RSA_SHA1 | HMAC_SHA1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_are_disjoint() {
        for uri in DIGEST_ALGORITHMS {
            assert!(!is_signature(uri));
            assert!(!is_encryption(uri));
        }
        for uri in SIGNATURE_ALGORITHMS {
            assert!(!is_digest(uri));
        }
    }

    #[test]
    fn test_unknown_uri() {
        assert!(!is_digest("http://www.w3.org/2001/04/xmldsig-more#md5"));
        assert!(!is_c14n(XPATH));
    }
}
