//! Request signing: detached ES512 JWS signatures over method, path, headers, and body.
//!
//! The signed payload is
//!
//! ```text
//! <METHOD> <path>\n
//! <Header-Name>: <value>\n      (one line per header, ordered by case-insensitive name)
//! <body bytes>
//! ```
//!
//! and the JWS protected header lists the signed header names in `tl_headers`, so the verifier
//! can rebuild the same byte sequence. ECDSA nonces are derived per RFC 6979 (HMAC-SHA-512),
//! which makes the signature a pure function of the key and the request.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use p521::{
	FieldBytes, ProjectivePoint, Scalar, SecretKey, U576,
	ecdsa::Signature,
	elliptic_curve::{ops::Reduce, point::AffineCoordinates},
	pkcs8::DecodePrivateKey,
};
use rfc6979::HmacDrbg;
use sha2::{Digest, Sha512};
// self
use crate::{_prelude::*, auth::Secret, config::Credential, error::SigningError};

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "Tl-Signature";

const ALGORITHM: &str = "ES512";
const SIGNATURE_VERSION: &str = "2";
// Bit length of the P-521 group order.
const ORDER_BITS: usize = 521;

/// HTTP methods used by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
}
impl Method {
	/// Returns the upper-case wire form.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Everything the signature binds: method, path (no host), headers, and body bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningInput {
	/// HTTP method.
	pub method: Method,
	/// Path (plus query string, when one is transmitted).
	pub path: String,
	/// Exact header set that is signed and later transmitted.
	pub headers: Vec<(String, String)>,
	/// Raw body; empty for bodiless requests.
	pub body: Vec<u8>,
}
impl SigningInput {
	/// Starts an input for `method` + `path` with no headers and an empty body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: Vec::new(), body: Vec::new() }
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Replaces the body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}
}
impl Debug for SigningInput {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SigningInput")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("headers", &RedactedHeaders(&self.headers))
			.field("body_len", &self.body.len())
			.finish()
	}
}

/// Signed headers plus the signature header, paired with the untouched body.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedRequest {
	/// HTTP method.
	pub method: Method,
	/// Signed path (plus query string).
	pub path: String,
	/// Signed headers followed by [`SIGNATURE_HEADER`].
	pub headers: Vec<(String, String)>,
	/// Body exactly as signed.
	pub body: Vec<u8>,
}
impl SignedRequest {
	/// Returns the signature header value.
	pub fn signature(&self) -> Option<&str> {
		self.header_value(SIGNATURE_HEADER)
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header_value(&self, name: &str) -> Option<&str> {
		find_header(&self.headers, name)
	}
}
impl Debug for SignedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignedRequest")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("headers", &RedactedHeaders(&self.headers))
			.field("body_len", &self.body.len())
			.finish()
	}
}

#[derive(Serialize)]
struct ProtectedHeader<'a> {
	alg: &'static str,
	kid: &'a str,
	tl_version: &'static str,
	tl_headers: String,
}

/// Computes the detached JWS signature for `input`.
pub fn sign(credential: &Credential, input: &SigningInput) -> Result<String, SigningError> {
	if credential.key_id.trim().is_empty() {
		return Err(SigningError::MissingKeyId);
	}

	let key = signing_key(&credential.private_key)?;
	let headers = canonical_headers(&input.headers)?;
	let protected = ProtectedHeader {
		alg: ALGORITHM,
		kid: &credential.key_id,
		tl_version: SIGNATURE_VERSION,
		tl_headers: headers.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(","),
	};
	let protected = serde_json::to_vec(&protected)
		.map_err(|e| SigningError::Backend { reason: e.to_string() })?;
	let protected = URL_SAFE_NO_PAD.encode(protected);
	let payload = signing_payload(input.method, &input.path, &headers, &input.body);
	let message = format!("{protected}.{}", URL_SAFE_NO_PAD.encode(payload));
	let signature = sign_deterministic(&key, message.as_bytes());

	Ok(format!("{protected}..{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())))
}

/// Signs `input` and returns its headers extended with [`SIGNATURE_HEADER`].
pub fn build_signed_request(
	credential: &Credential,
	input: SigningInput,
) -> Result<SignedRequest, SigningError> {
	let signature = sign(credential, &input)?;
	let SigningInput { method, path, mut headers, body } = input;

	headers.push((SIGNATURE_HEADER.to_owned(), signature));

	Ok(SignedRequest { method, path, headers, body })
}

fn signing_key(pem: &Secret) -> Result<SecretKey, SigningError> {
	// Keys pasted into environment variables often carry literal `\n` sequences.
	let pem = pem.expose().trim().replace("\\n", "\n");
	let parsed = if pem.contains("BEGIN EC PRIVATE KEY") {
		SecretKey::from_sec1_pem(&pem).map_err(|e| e.to_string())
	} else {
		SecretKey::from_pkcs8_pem(&pem).map_err(|e| e.to_string())
	};

	parsed.map_err(|reason| SigningError::InvalidPrivateKey { reason })
}

/// ECDSA over SHA-512 with the ephemeral scalar drawn from the RFC 6979 section 3.2 HMAC-DRBG.
fn sign_deterministic(key: &SecretKey, message: &[u8]) -> Signature {
	let d = Scalar::from(key);
	// A 512-bit digest is already below the group order, so bits2octets only left-pads it.
	let digest = Sha512::digest(message);
	let mut h = FieldBytes::default();
	let offset = h.len() - digest.len();

	h[offset..].copy_from_slice(&digest);

	let z = <Scalar as Reduce<U576>>::reduce_bytes(&h);
	let mut drbg = HmacDrbg::<Sha512>::new(&d.to_bytes(), &h, &[]);

	loop {
		let mut t = FieldBytes::default();

		drbg.fill_bytes(&mut t);
		// bits2int keeps the leftmost ORDER_BITS bits of the candidate.
		let excess_bits = t.len() * 8 - ORDER_BITS;

		shift_right(&mut t, excess_bits);

		let Some(k) = Option::<Scalar>::from(Scalar::from_bytes(&t)) else { continue };
		let Some(k_inv) = Option::<Scalar>::from(k.invert()) else { continue };
		let r = (&ProjectivePoint::GENERATOR * &k).to_affine();
		let r = <Scalar as Reduce<U576>>::reduce_bytes(&r.x());
		let s = k_inv * (z + r * d);

		// Zero `r` or `s` is rejected here and the DRBG moves on to the next candidate.
		if let Ok(signature) = Signature::from_scalars(r, s) {
			return signature;
		}
	}
}

fn shift_right(bytes: &mut [u8], bits: usize) {
	if bits == 0 {
		return;
	}

	for i in (0..bytes.len()).rev() {
		let carry = if i == 0 { 0 } else { bytes[i - 1] << (8 - bits) };

		bytes[i] = (bytes[i] >> bits) | carry;
	}
}

fn canonical_headers(headers: &[(String, String)]) -> Result<Vec<(&str, &str)>, SigningError> {
	let mut sorted = Vec::with_capacity(headers.len());

	for (name, value) in headers {
		let valid_name = !name.is_empty()
			&& name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
			&& !name.eq_ignore_ascii_case(SIGNATURE_HEADER);

		if !valid_name || value.contains(['\r', '\n']) {
			return Err(SigningError::InvalidHeader { name: name.clone() });
		}

		sorted.push((name.as_str(), value.as_str()));
	}

	sorted.sort_by_key(|(name, _)| name.to_ascii_lowercase());

	if let Some(pair) = sorted.windows(2).find(|pair| pair[0].0.eq_ignore_ascii_case(pair[1].0)) {
		return Err(SigningError::DuplicateHeader { name: pair[1].0.to_owned() });
	}

	Ok(sorted)
}

fn signing_payload(method: Method, path: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
	let mut payload = Vec::with_capacity(body.len() + 128);

	payload.extend_from_slice(method.as_str().as_bytes());
	payload.push(b' ');
	payload.extend_from_slice(path.as_bytes());
	payload.push(b'\n');

	for (name, value) in headers {
		payload.extend_from_slice(name.as_bytes());
		payload.extend_from_slice(b": ");
		payload.extend_from_slice(value.as_bytes());
		payload.push(b'\n');
	}

	payload.extend_from_slice(body);

	payload
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
	headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
}

struct RedactedHeaders<'a>(&'a [(String, String)]);
impl Debug for RedactedHeaders<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_map()
			.entries(self.0.iter().map(|(name, value)| {
				let shown = if name.eq_ignore_ascii_case("authorization") {
					"<redacted>"
				} else {
					value.as_str()
				};

				(name, shown)
			}))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use p521::ecdsa::{VerifyingKey, signature::Verifier};
	// self
	use super::*;
	use crate::config::Endpoints;

	const SEC1_PEM: &str = include_str!("../tests/fixtures/ec512-private.pem");
	const PKCS8_PEM: &str = include_str!("../tests/fixtures/ec512-private-pkcs8.pem");

	fn credential(key_id: &str, pem: &str) -> Credential {
		let endpoints = Endpoints::parse("https://auth.example.com", "https://api.example.com")
			.expect("Test endpoints should parse.");

		Credential::new(key_id, pem, "client", "secret", endpoints)
	}

	fn input() -> SigningInput {
		SigningInput::new(Method::Post, "/v3/payouts")
			.header("Idempotency-Key", "idem-1")
			.header("Content-Type", "application/json")
			.body(br#"{"amount_in_minor":100}"#.to_vec())
	}

	#[test]
	fn signing_is_deterministic_across_key_encodings() {
		let sec1 = credential("kid-1", SEC1_PEM);
		let pkcs8 = credential("kid-1", PKCS8_PEM);
		let first = sign(&sec1, &input()).expect("SEC1 key should sign.");
		let second = sign(&sec1, &input()).expect("SEC1 key should sign twice.");
		let third = sign(&pkcs8, &input()).expect("PKCS#8 key should sign.");

		assert_eq!(first, second);
		assert_eq!(first, third);
	}

	#[test]
	fn signature_verifies_against_the_public_key() {
		let credential = credential("kid-1", SEC1_PEM);
		let input = input();
		let header = sign(&credential, &input).expect("Input should sign.");
		let (protected, raw) = header.split_once("..").expect("Signature should be detached.");
		let headers = canonical_headers(&input.headers).expect("Headers should canonicalize.");
		let payload = signing_payload(input.method, &input.path, &headers, &input.body);
		let message = format!("{protected}.{}", URL_SAFE_NO_PAD.encode(payload));
		let signature = Signature::from_slice(
			&URL_SAFE_NO_PAD.decode(raw).expect("Signature should be base64url."),
		)
		.expect("Signature should hold two P-521 scalars.");
		let key = signing_key(&credential.private_key).expect("Fixture key should parse.");
		let verifying_key = VerifyingKey::from_affine(*key.public_key().as_affine())
			.expect("Public key should be a valid point.");
		let forged = format!("{protected}.{}", URL_SAFE_NO_PAD.encode("GET /v3/payouts\n"));

		assert!(verifying_key.verify(message.as_bytes(), &signature).is_ok());
		assert!(verifying_key.verify(forged.as_bytes(), &signature).is_err());
	}

	#[test]
	fn nonce_candidates_keep_the_leftmost_bits() {
		let mut bytes = [0x00, 0xFF, 0x80];

		shift_right(&mut bytes, 7);

		assert_eq!(bytes, [0x00, 0x01, 0xFF]);

		let mut untouched = [0xAB, 0xCD];

		shift_right(&mut untouched, 0);

		assert_eq!(untouched, [0xAB, 0xCD]);
	}

	#[test]
	fn every_bound_input_changes_the_signature() {
		let credential = credential("kid-1", SEC1_PEM);
		let baseline = sign(&credential, &input()).expect("Baseline should sign.");
		let mut method = input();

		method.method = Method::Get;

		let mut path = input();

		path.path = "/v3/payouts/other".into();

		let mut header = input();

		header.headers[0].1 = "idem-2".into();

		let body = input().body(br#"{"amount_in_minor":101}"#.to_vec());

		for (label, variant) in [("method", method), ("path", path), ("header", header), ("body", body)]
		{
			let signature = sign(&credential, &variant).expect("Variant should sign.");

			assert_ne!(signature, baseline, "Changing the {label} must change the signature.");
		}
	}

	#[test]
	fn header_construction_order_is_irrelevant() {
		let credential = credential("kid-1", SEC1_PEM);
		let reversed = SigningInput::new(Method::Post, "/v3/payouts")
			.header("Content-Type", "application/json")
			.header("Idempotency-Key", "idem-1")
			.body(br#"{"amount_in_minor":100}"#.to_vec());

		assert_eq!(
			sign(&credential, &input()).expect("Input should sign."),
			sign(&credential, &reversed).expect("Reversed input should sign."),
		);
	}

	#[test]
	fn signature_is_a_detached_es512_jws() {
		let credential = credential("kid-1", SEC1_PEM);
		let signature = sign(&credential, &input()).expect("Input should sign.");
		let (protected, raw) =
			signature.split_once("..").expect("Detached JWS should contain an empty payload.");
		let protected = URL_SAFE_NO_PAD.decode(protected).expect("Header should be base64url.");
		let protected: serde_json::Value =
			serde_json::from_slice(&protected).expect("Header should be JSON.");
		let raw = URL_SAFE_NO_PAD.decode(raw).expect("Signature should be base64url.");

		assert_eq!(protected["alg"], "ES512");
		assert_eq!(protected["kid"], "kid-1");
		assert_eq!(protected["tl_version"], "2");
		assert_eq!(protected["tl_headers"], "Content-Type,Idempotency-Key");
		assert_eq!(raw.len(), 132);
	}

	#[test]
	fn payload_lists_sorted_headers_then_body() {
		let input = input();
		let headers = canonical_headers(&input.headers).expect("Headers should canonicalize.");
		let payload = signing_payload(input.method, &input.path, &headers, &input.body);

		assert_eq!(
			String::from_utf8(payload).expect("Payload should be UTF-8."),
			"POST /v3/payouts\nContent-Type: application/json\nIdempotency-Key: idem-1\n{\"amount_in_minor\":100}",
		);
	}

	#[test]
	fn signing_fails_closed_on_bad_credentials() {
		assert_eq!(sign(&credential(" ", SEC1_PEM), &input()), Err(SigningError::MissingKeyId));
		assert!(matches!(
			sign(&credential("kid", "not a key"), &input()),
			Err(SigningError::InvalidPrivateKey { .. })
		));
	}

	#[test]
	fn escaped_newlines_in_key_material_are_accepted() {
		let escaped = SEC1_PEM.trim().replace('\n', "\\n");

		assert_eq!(
			sign(&credential("kid", &escaped), &input()).expect("Escaped PEM should sign."),
			sign(&credential("kid", SEC1_PEM), &input()).expect("Plain PEM should sign."),
		);
	}

	#[test]
	fn invalid_or_duplicate_headers_are_rejected() {
		let credential = credential("kid", SEC1_PEM);
		let duplicate = input().header("content-type", "text/plain");
		let injected = input().header("X-Test", "a\nb");
		let presigned = input().header("tl-signature", "forged");

		assert!(matches!(
			sign(&credential, &duplicate),
			Err(SigningError::DuplicateHeader { .. })
		));
		assert!(matches!(sign(&credential, &injected), Err(SigningError::InvalidHeader { .. })));
		assert!(matches!(sign(&credential, &presigned), Err(SigningError::InvalidHeader { .. })));
	}

	#[test]
	fn signed_request_appends_signature_and_keeps_body() {
		let credential = credential("kid", SEC1_PEM);
		let input = input().header("Authorization", "Bearer token-value");
		let expected = sign(&credential, &input).expect("Input should sign.");
		let signed = build_signed_request(&credential, input.clone()).expect("Request should build.");

		assert_eq!(signed.signature(), Some(expected.as_str()));
		assert_eq!(signed.headers.len(), input.headers.len() + 1);
		assert_eq!(&signed.headers[..input.headers.len()], input.headers.as_slice());
		assert_eq!(signed.body, input.body);
		assert!(!format!("{signed:?}").contains("token-value"));
	}
}
