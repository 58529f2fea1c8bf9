//! Certificates and key handles.
//!
//! - [`Certificate`]: an X.509 certificate plus its fingerprint
//! - [`KeyPair`]: a certificate with its RSA private key, used to sign
//! - [`VerificationKey`]: a certificate with its RSA public key, used to verify
//!
//! The fingerprint is the uppercase hex SHA-1 of the DER certificate.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{Id, PKey, PKeyRef, Private, Public};
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509NameRef, X509Ref, X509};
use paygate_wire::{Fingerprint, PublicKeyInfo};

use crate::error::{CryptoError, CryptoResult};

/// RSA modulus size for generated keys.
pub const DEFAULT_KEY_BITS: u32 = 2048;

/// An X.509 certificate.
#[derive(Clone)]
pub struct Certificate {
    x509: X509,
    fingerprint: Fingerprint,
}

impl Certificate {
    pub fn from_x509(x509: X509) -> CryptoResult<Self> {
        let digest = x509.digest(MessageDigest::sha1())?;
        Ok(Self {
            fingerprint: Fingerprint::from_digest(&digest),
            x509,
        })
    }

    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        Self::from_x509(X509::from_der(der)?)
    }

    /// Parse the first certificate of a PEM document.
    pub fn from_pem(pem: &[u8]) -> CryptoResult<Self> {
        Self::from_x509(X509::from_pem(pem)?)
    }

    /// Parse a base64 DER certificate, as served by the key endpoint.
    pub fn from_base64_der(encoded: &str) -> CryptoResult<Self> {
        let der = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::invalid_key(format!("certificate is not valid base64: {e}")))?;
        Self::from_der(&der)
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn x509(&self) -> &X509Ref {
        &self.x509
    }

    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.x509.to_der()?)
    }

    pub fn to_pem(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.x509.to_pem()?)
    }

    pub fn public_key(&self) -> CryptoResult<PKey<Public>> {
        Ok(self.x509.public_key()?)
    }

    /// Common names of the subject.
    pub fn subject_common_names(&self) -> Vec<String> {
        common_names(self.x509.subject_name())
    }

    /// Common names of the issuer.
    pub fn issuer_common_names(&self) -> Vec<String> {
        common_names(self.x509.issuer_name())
    }

    /// Whether any subject or issuer common name contains `name`, ignoring ASCII case.
    pub fn matches_name(&self, name: &str) -> bool {
        let needle = name.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.subject_common_names()
            .into_iter()
            .chain(self.issuer_common_names())
            .any(|cn| cn.to_ascii_lowercase().contains(&needle))
    }

    /// The certificate in the shape the key endpoint publishes.
    pub fn public_key_info(&self) -> CryptoResult<PublicKeyInfo> {
        Ok(PublicKeyInfo {
            fingerprint: self.fingerprint.clone(),
            key: BASE64.encode(self.to_der()?),
        })
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.fingerprint)
            .field("subject", &self.subject_common_names())
            .finish()
    }
}

fn common_names(name: &X509NameRef) -> Vec<String> {
    name.entries_by_nid(Nid::COMMONNAME)
        .map(|entry| String::from_utf8_lossy(entry.data().as_slice()).into_owned())
        .collect()
}

fn ensure_rsa<T>(key: &PKeyRef<T>) -> CryptoResult<()> {
    if key.id() == Id::RSA {
        Ok(())
    } else {
        Err(CryptoError::invalid_key(format!(
            "expected an RSA key, got {:?}",
            key.id()
        )))
    }
}

/// A certificate together with its private key.
#[derive(Clone)]
pub struct KeyPair {
    certificate: Certificate,
    private_key: PKey<Private>,
}

impl KeyPair {
    /// Pair a certificate with its private key.
    ///
    /// Fails unless the key is RSA and matches the certificate's public key.
    pub fn new(certificate: Certificate, private_key: PKey<Private>) -> CryptoResult<Self> {
        ensure_rsa(&private_key)?;
        let public = certificate.public_key()?;
        if !public.public_eq(&private_key) {
            return Err(CryptoError::invalid_key(format!(
                "private key does not match certificate {}",
                certificate.fingerprint()
            )));
        }
        Ok(Self {
            certificate,
            private_key,
        })
    }

    /// Load a PKCS#12 (`.pfx`/`.p12`) archive.
    pub fn from_pkcs12(der: &[u8], password: &str) -> CryptoResult<Self> {
        let parsed = Pkcs12::from_der(der)?.parse2(password)?;
        let cert = parsed
            .cert
            .ok_or_else(|| CryptoError::invalid_key("PKCS#12 archive has no certificate"))?;
        let key = parsed
            .pkey
            .ok_or_else(|| CryptoError::invalid_key("PKCS#12 archive has no private key"))?;
        Self::new(Certificate::from_x509(cert)?, key)
    }

    /// Load a PEM document holding a certificate and its private key.
    pub fn from_pem(pem: &[u8]) -> CryptoResult<Self> {
        let cert = Certificate::from_pem(pem)?;
        let key = PKey::private_key_from_pem(pem)?;
        Self::new(cert, key)
    }

    /// Generate a self-signed RSA certificate for `common_name`.
    pub fn generate_self_signed(common_name: &str, validity_days: u32) -> CryptoResult<Self> {
        let private_key = PKey::from_rsa(Rsa::generate(DEFAULT_KEY_BITS)?)?;

        let mut name = X509NameBuilder::new()?;
        name.append_entry_by_nid(Nid::COMMONNAME, common_name)?;
        let name = name.build();

        let serial = {
            let mut bn = BigNum::new()?;
            bn.rand(63, MsbOption::MAYBE_ZERO, false)?;
            bn.to_asn1_integer()?
        };

        let mut builder = X509::builder()?;
        builder.set_version(2)?;
        builder.set_serial_number(&serial)?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;
        builder.set_pubkey(&private_key)?;
        let not_before = Asn1Time::days_from_now(0)?;
        let not_after = Asn1Time::days_from_now(validity_days)?;
        builder.set_not_before(&not_before)?;
        builder.set_not_after(&not_after)?;
        builder.sign(&private_key, MessageDigest::sha256())?;

        Self::new(Certificate::from_x509(builder.build())?, private_key)
    }

    /// Export as a password-protected PKCS#12 archive.
    pub fn to_pkcs12(&self, friendly_name: &str, password: &str) -> CryptoResult<Vec<u8>> {
        let archive = Pkcs12::builder()
            .name(friendly_name)
            .pkey(&self.private_key)
            .cert(&self.certificate.x509)
            .build2(password)?;
        Ok(archive.to_der()?)
    }

    /// Export as PEM: certificate followed by the PKCS#8 private key.
    pub fn to_pem(&self) -> CryptoResult<Vec<u8>> {
        let mut pem = self.certificate.to_pem()?;
        pem.extend(self.private_key.private_key_to_pem_pkcs8()?);
        Ok(pem)
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        self.certificate.fingerprint()
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn private_key(&self) -> &PKeyRef<Private> {
        &self.private_key
    }

    /// The public half, as the key endpoint would publish it.
    pub fn public_key_info(&self) -> CryptoResult<PublicKeyInfo> {
        self.certificate.public_key_info()
    }

    /// The public half as a verification key.
    pub fn verification_key(&self) -> CryptoResult<VerificationKey> {
        VerificationKey::from_certificate(self.certificate.clone())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("certificate", &self.certificate)
            .field("private_key", &"[redacted]")
            .finish()
    }
}

/// A certificate's public key, used to verify envelopes it signed.
#[derive(Clone)]
pub struct VerificationKey {
    certificate: Certificate,
    public_key: PKey<Public>,
}

impl VerificationKey {
    pub fn from_certificate(certificate: Certificate) -> CryptoResult<Self> {
        let public_key = certificate.public_key()?;
        ensure_rsa(&public_key)?;
        Ok(Self {
            certificate,
            public_key,
        })
    }

    /// Decode a published key.
    ///
    /// The asserted fingerprint is not checked here; compare it with
    /// [`VerificationKey::fingerprint`].
    pub fn from_public_key_info(info: &PublicKeyInfo) -> CryptoResult<Self> {
        Self::from_certificate(Certificate::from_base64_der(&info.key)?)
    }

    /// Computed thumbprint of the certificate.
    pub fn fingerprint(&self) -> &Fingerprint {
        self.certificate.fingerprint()
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn public_key(&self) -> &PKeyRef<Public> {
        &self.public_key
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("fingerprint", self.fingerprint())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{acme, gateway};
    use super::*;

    #[test]
    fn test_fingerprint_is_uppercase_sha1() {
        let pair = acme();
        let fp = pair.fingerprint().as_str();
        assert_eq!(fp.len(), 40);
        assert!(fp.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

        let der = pair.certificate().to_der().unwrap();
        let reparsed = Certificate::from_der(&der).unwrap();
        assert_eq!(reparsed.fingerprint().as_str(), fp);
    }

    #[test]
    fn test_matches_name_substring_case_insensitive() {
        let cert = gateway().certificate();
        assert!(cert.matches_name("gateway"));
        assert!(cert.matches_name("WAY SIGN"));
        assert!(!cert.matches_name("acme"));
        assert!(!cert.matches_name("  "));
    }

    #[test]
    fn test_common_names_read_from_subject_and_issuer() {
        let cert = gateway().certificate();
        assert_eq!(cert.subject_common_names(), vec!["Gateway Signing"]);
        assert_eq!(cert.issuer_common_names(), vec!["Gateway Signing"]);

        let pair = KeyPair::generate_self_signed("Pagos Señor Ñandú", 1).unwrap();
        assert_eq!(pair.certificate().subject_common_names(), vec!["Pagos Señor Ñandú"]);
        assert!(pair.certificate().matches_name("señor"));
    }

    #[test]
    fn test_pkcs12_roundtrip_preserves_fingerprint() {
        let pair = acme();
        let der = pair.to_pkcs12("Acme", "s3cret").unwrap();
        let loaded = KeyPair::from_pkcs12(&der, "s3cret").unwrap();
        assert_eq!(loaded.fingerprint(), pair.fingerprint());
        assert!(KeyPair::from_pkcs12(&der, "wrong").is_err());
    }

    #[test]
    fn test_pem_with_key() {
        let pem = acme().to_pem().unwrap();
        let loaded = KeyPair::from_pem(&pem).unwrap();
        assert_eq!(loaded.fingerprint(), acme().fingerprint());
    }

    #[test]
    fn test_mismatched_key_rejected() {
        let cert = acme().certificate().clone();
        let other = gateway().private_key().to_owned();
        let err = KeyPair::new(cert, other).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[test]
    fn test_public_key_info_decodes_to_same_fingerprint() {
        let info = gateway().public_key_info().unwrap();
        assert_eq!(&info.fingerprint, gateway().fingerprint());

        let key = VerificationKey::from_public_key_info(&info).unwrap();
        assert_eq!(key.fingerprint(), gateway().fingerprint());
    }

    #[test]
    fn test_bad_base64_key() {
        let info = PublicKeyInfo {
            fingerprint: Fingerprint::new("AA"),
            key: "not base64!".into(),
        };
        assert!(matches!(
            VerificationKey::from_public_key_info(&info).unwrap_err(),
            CryptoError::InvalidKey(_)
        ));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let debug = format!("{:?}", acme());
        assert!(debug.contains("[redacted]"));
        assert!(!debug.contains("PRIVATE"));
    }
}
