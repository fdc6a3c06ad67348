#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Encryption namespace
pub const ENC: &str = "http://www.w3.org/2001/04/xmlenc#";

/// Exclusive C14N namespace
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// Conventional prefixes used when emitting elements.
pub mod prefix {
    pub const DSIG: &str = "ds";
    pub const ENC: &str = "xenc";
    pub const EXC_C14N: &str = "ec";
}

/// Local names of the elements this library reads and writes.
pub mod node {
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const XPATH: &str = "XPath";
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";

    pub const ENCRYPTED_DATA: &str = "EncryptedData";
    pub const ENCRYPTED_KEY: &str = "EncryptedKey";
    pub const ENCRYPTION_METHOD: &str = "EncryptionMethod";
    pub const KEY_SIZE: &str = "KeySize";
    pub const OAEP_PARAMS: &str = "OAEPparams";
    pub const CIPHER_DATA: &str = "CipherData";
    pub const CIPHER_VALUE: &str = "CipherValue";
    pub const CIPHER_REFERENCE: &str = "CipherReference";
    pub const REFERENCE_LIST: &str = "ReferenceList";
    pub const DATA_REFERENCE: &str = "DataReference";
    pub const KEY_REFERENCE: &str = "KeyReference";
    pub const CARRIED_KEY_NAME: &str = "CarriedKeyName";
}

/// Unqualified attribute names.
pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const MIME_TYPE: &str = "MimeType";
    pub const ENCODING: &str = "Encoding";
    pub const ALGORITHM: &str = "Algorithm";
    pub const RECIPIENT: &str = "Recipient";
    pub const PREFIX_LIST: &str = "PrefixList";
}

/// `Type` of an EncryptedData holding element content.
pub const ENC_TYPE_CONTENT: &str = "http://www.w3.org/2001/04/xmlenc#Content";
