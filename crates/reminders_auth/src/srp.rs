//! SRP-6a client.
//!
//! Uses the RFC 5054 2048-bit group with `g = 2` and SHA-256. The account
//! name is left out of `x`, and the password is pre-stretched with PBKDF2
//! before it enters the exchange:
//!
//! ```text
//! k  = H(N | PAD(g))
//! u  = H(PAD(A) | PAD(B))
//! x  = H(s | H(":" | P))
//! S  = (B - k * g^x) ^ (a + u * x) mod N
//! K  = H(S)
//! M1 = H(H(N) xor H(PAD(g)) | H(I) | s | A | B | K)
//! M2 = H(A | M1 | K)
//! ```

use num_bigint::BigUint;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{AuthError, AuthResult};

const N_HEX: &[u8] = b"AC6BDB41324A9A9BF166DE5E1389582FAF72B6651987EE07FC3192943DB56050A37329CBB4A099ED8193E0757767A13DD52312AB4B03310DCD7F48A9DA04FD50E8083969EDB767B0CF6095179A163AB3661A05FBD5FAAAE82918A9962F0B93B855F97993EC975EEAA80D740ADBF4FF747359D041D5C33EA71D281E446B14773BCA97B43A23FB801676BD207A436C6481F1D2B9078717461A5B9D32E688F87748544523B524B0D57D5EA77A2775D2ECFA032CFBDBF52FB3786160279004E57AE6AF874E7303CE53299CCC041C7BC308D82A5698F3A8D0C38271AE35F8E9DBFBB694B5C803D89F7AE435DE236D525F54759B65E372FCD68EF20FA7111F9E4AFF73";

/// Byte length of the group modulus.
pub const GROUP_LEN: usize = 256;

/// Length of the private ephemeral value in bytes.
const PRIVATE_LEN: usize = 32;

/// Password-stretching protocol announced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordProtocol {
    /// PBKDF2 over the raw SHA-256 digest.
    S2k,
    /// PBKDF2 over the lowercase hex of the SHA-256 digest.
    S2kFo,
}

impl PasswordProtocol {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordProtocol::S2k => "s2k",
            PasswordProtocol::S2kFo => "s2k_fo",
        }
    }

    /// Parses a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "s2k" => Some(PasswordProtocol::S2k),
            "s2k_fo" => Some(PasswordProtocol::S2kFo),
            _ => None,
        }
    }
}

/// Group parameters.
#[derive(Debug, Clone)]
pub struct SrpGroup {
    /// Safe prime modulus.
    pub n: BigUint,
    /// Generator.
    pub g: BigUint,
}

impl SrpGroup {
    /// The RFC 5054 2048-bit group.
    pub fn rfc5054_2048() -> Self {
        let n = BigUint::parse_bytes(N_HEX, 16).unwrap_or_default();
        Self {
            n,
            g: BigUint::from(2u32),
        }
    }

    /// `k = H(N | PAD(g))`.
    pub fn multiplier(&self) -> BigUint {
        BigUint::from_bytes_be(&hash(&[&self.n.to_bytes_be(), &pad(&self.g)]))
    }
}

/// Stretches the password into the SRP password key.
pub fn derive_password_key(
    password: &str,
    salt: &[u8],
    iterations: u32,
    protocol: PasswordProtocol,
) -> Zeroizing<Vec<u8>> {
    let digest = Zeroizing::new(Sha256::digest(password.as_bytes()).to_vec());
    let input: Zeroizing<Vec<u8>> = match protocol {
        PasswordProtocol::S2k => digest,
        PasswordProtocol::S2kFo => Zeroizing::new(to_hex(&digest).into_bytes()),
    };
    let mut key = Zeroizing::new(vec![0u8; 32]);
    pbkdf2_hmac::<Sha256>(&input, salt, iterations, &mut key);
    key
}

/// Client half of one SRP exchange.
pub struct SrpClient {
    group: SrpGroup,
    private: Zeroizing<Vec<u8>>,
    public: BigUint,
}

/// Proofs produced by [`SrpClient::process_challenge`].
pub struct SrpProof {
    /// Client proof `M1`.
    pub m1: Vec<u8>,
    /// Expected server proof `M2`.
    pub m2: Vec<u8>,
    key: Zeroizing<Vec<u8>>,
}

impl SrpProof {
    /// Shared session key `K`.
    pub fn session_key(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for SrpProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrpProof").finish_non_exhaustive()
    }
}

impl SrpClient {
    /// Starts an exchange with a fresh random ephemeral key.
    pub fn new() -> Self {
        let mut private = Zeroizing::new(vec![0u8; PRIVATE_LEN]);
        rand::thread_rng().fill_bytes(&mut private);
        Self::with_private_key(&private)
    }

    /// Starts an exchange with a caller-chosen ephemeral key.
    pub fn with_private_key(private: &[u8]) -> Self {
        let group = SrpGroup::rfc5054_2048();
        let a = BigUint::from_bytes_be(private);
        let public = group.g.modpow(&a, &group.n);
        Self {
            group,
            private: Zeroizing::new(private.to_vec()),
            public,
        }
    }

    /// Public ephemeral value `A`, big-endian.
    pub fn public_key(&self) -> Vec<u8> {
        self.public.to_bytes_be()
    }

    /// Computes the proofs for the server challenge.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Srp`] if the server value is degenerate.
    pub fn process_challenge(
        &self,
        username: &str,
        password_key: &[u8],
        salt: &[u8],
        server_public: &[u8],
    ) -> AuthResult<SrpProof> {
        let n = &self.group.n;
        let b_pub = BigUint::from_bytes_be(server_public);
        if (&b_pub % n) == BigUint::default() {
            return Err(AuthError::srp("server public value is zero mod N"));
        }

        let u = BigUint::from_bytes_be(&hash(&[&pad(&self.public), &pad(&b_pub)]));
        if u == BigUint::default() {
            return Err(AuthError::srp("scrambling parameter is zero"));
        }

        let k = self.group.multiplier();
        let x = compute_x(password_key, salt);
        let a = BigUint::from_bytes_be(&self.private);

        let kgx = (&k * self.group.g.modpow(&x, n)) % n;
        let base = ((&b_pub % n) + n - kgx) % n;
        let exponent = &a + &u * &x;
        let shared = base.modpow(&exponent, n);
        let key = Zeroizing::new(hash(&[&shared.to_bytes_be()]));

        let a_bytes = self.public.to_bytes_be();
        let m1 = client_proof(&self.group, username, salt, &a_bytes, server_public, &key);
        let m2 = hash(&[&a_bytes, &m1, &key]);

        Ok(SrpProof { m1, m2, key })
    }
}

impl Default for SrpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// `x = H(s | H(":" | P))`.
fn compute_x(password_key: &[u8], salt: &[u8]) -> BigUint {
    let inner = Zeroizing::new(hash(&[b":", password_key]));
    BigUint::from_bytes_be(&hash(&[salt, &inner]))
}

fn client_proof(
    group: &SrpGroup,
    username: &str,
    salt: &[u8],
    a: &[u8],
    b: &[u8],
    key: &[u8],
) -> Vec<u8> {
    let hn = hash(&[&group.n.to_bytes_be()]);
    let hg = hash(&[&pad(&group.g)]);
    let xored: Vec<u8> = hn.iter().zip(hg.iter()).map(|(l, r)| l ^ r).collect();
    let hi = hash(&[username.as_bytes()]);
    hash(&[&xored, &hi, salt, a, b, key])
}

fn hash(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

/// Left-pads to the group length.
fn pad(value: &BigUint) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    if bytes.len() >= GROUP_LEN {
        return bytes;
    }
    let mut padded = vec![0u8; GROUP_LEN - bytes.len()];
    padded.extend_from_slice(&bytes);
    padded
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "user@example.com";
    const SALT: &[u8] = b"salty";

    #[test]
    fn group_is_2048_bits() {
        let group = SrpGroup::rfc5054_2048();
        assert_eq!(group.n.bits(), 2048);
        assert_eq!(group.n.to_bytes_be().len(), GROUP_LEN);
    }

    #[test]
    fn password_key_vectors() {
        let s2k = derive_password_key("correct horse", SALT, 1000, PasswordProtocol::S2k);
        assert_eq!(
            to_hex(&s2k),
            "b6d6c917b5cf7350de0dc64e21b34e7d78b4c6c391287e21fbd759822ec89b97"
        );
        let fo = derive_password_key("correct horse", SALT, 1000, PasswordProtocol::S2kFo);
        assert_eq!(
            to_hex(&fo),
            "72f6905268ab97cb2e6fe3e7a5116cef82a4441a252278ff4e92ef2a77b8e5be"
        );
    }

    #[test]
    fn protocol_names() {
        assert_eq!(PasswordProtocol::parse("s2k"), Some(PasswordProtocol::S2k));
        assert_eq!(PasswordProtocol::parse("s2k_fo"), Some(PasswordProtocol::S2kFo));
        assert_eq!(PasswordProtocol::parse("plain"), None);
        assert_eq!(PasswordProtocol::S2kFo.as_str(), "s2k_fo");
    }

    /// Server side of the exchange, computed independently.
    struct Server {
        group: SrpGroup,
        verifier: BigUint,
        b: BigUint,
        public: BigUint,
    }

    impl Server {
        fn new(password_key: &[u8], b: &[u8]) -> Self {
            let group = SrpGroup::rfc5054_2048();
            let x = compute_x(password_key, SALT);
            let verifier = group.g.modpow(&x, &group.n);
            let b = BigUint::from_bytes_be(b);
            let public =
                (group.multiplier() * &verifier + group.g.modpow(&b, &group.n)) % &group.n;
            Self {
                group,
                verifier,
                b,
                public,
            }
        }

        fn session_key(&self, client_public: &[u8]) -> Vec<u8> {
            let n = &self.group.n;
            let a = BigUint::from_bytes_be(client_public);
            let u = BigUint::from_bytes_be(&hash(&[&pad(&a), &pad(&self.public)]));
            let shared = (a * self.verifier.modpow(&u, n)).modpow(&self.b, n);
            hash(&[&shared.to_bytes_be()])
        }
    }

    #[test]
    fn proof_verifies_against_server() {
        let password_key = derive_password_key("correct horse", SALT, 1000, PasswordProtocol::S2k);
        let server = Server::new(&password_key, &[7u8; 32]);
        let client = SrpClient::with_private_key(&[3u8; 32]);

        let proof = client
            .process_challenge(USER, &password_key, SALT, &server.public.to_bytes_be())
            .unwrap();

        let key = server.session_key(&client.public_key());
        assert_eq!(proof.session_key(), key.as_slice());

        let expected_m1 = client_proof(
            &server.group,
            USER,
            SALT,
            &client.public_key(),
            &server.public.to_bytes_be(),
            &key,
        );
        assert_eq!(proof.m1, expected_m1);
        assert_eq!(proof.m2, hash(&[&client.public_key(), &expected_m1, &key]));
    }

    #[test]
    fn wrong_password_yields_different_proof() {
        let right = derive_password_key("correct horse", SALT, 1000, PasswordProtocol::S2k);
        let wrong = derive_password_key("battery staple", SALT, 1000, PasswordProtocol::S2k);
        let server = Server::new(&right, &[9u8; 32]);
        let client = SrpClient::with_private_key(&[5u8; 32]);

        let proof = client
            .process_challenge(USER, &wrong, SALT, &server.public.to_bytes_be())
            .unwrap();
        assert_ne!(proof.session_key(), server.session_key(&client.public_key()).as_slice());
    }

    #[test]
    fn rejects_degenerate_server_value() {
        let client = SrpClient::new();
        let key = [1u8; 32];
        assert!(client.process_challenge(USER, &key, SALT, &[0u8]).is_err());
        let n = SrpGroup::rfc5054_2048().n.to_bytes_be();
        assert!(client.process_challenge(USER, &key, SALT, &n).is_err());
    }

    #[test]
    fn random_clients_differ() {
        assert_ne!(SrpClient::new().public_key(), SrpClient::new().public_key());
    }
}
