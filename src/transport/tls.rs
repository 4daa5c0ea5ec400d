//! Optional TLS layer over the raw TCP transport (spec §4.2: "Encryption
//! (TLS) is a boolean toggle; when on, all reads/writes go through the TLS
//! layer. Certificate verification is optional and callback-driven.").

use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme, StreamOwned};

use crate::error::{Error, Result};

/// Callback the embedding application supplies to accept or reject a
/// server certificate chain. The panel core never ships its own trust
/// store; verification policy is entirely the caller's decision, matching
/// the spec's "optional and callback-driven" wording.
pub trait CertVerifier: fmt::Debug + Send + Sync {
    /// `chain` is the DER-encoded leaf certificate followed by any
    /// intermediates, in the order the peer presented them.
    fn accept(&self, chain: &[Vec<u8>]) -> bool;
}

/// A verifier that accepts every certificate. Only appropriate for test
/// fixtures or controllers on a trusted network segment.
#[derive(Debug, Default)]
pub struct AcceptAnyCert;

impl CertVerifier for AcceptAnyCert {
    fn accept(&self, _chain: &[Vec<u8>]) -> bool {
        true
    }
}

#[derive(Debug)]
struct CallbackVerifier(Arc<dyn CertVerifier>);

impl ServerCertVerifier for CallbackVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let mut chain = vec![end_entity.as_ref().to_vec()];
        chain.extend(intermediates.iter().map(|c| c.as_ref().to_vec()));
        if self.0.accept(&chain) {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::General("certificate rejected by callback".into()))
        }
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
        ]
    }
}

/// A blocking TLS-wrapped stream over a [`TcpStream`].
pub struct TlsStream {
    inner: StreamOwned<ClientConnection, TcpStream>,
}

impl fmt::Debug for TlsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsStream").finish_non_exhaustive()
    }
}

impl TlsStream {
    /// Perform the TLS handshake over an already-connected TCP socket.
    pub fn connect(stream: TcpStream, server_name: &str, verifier: Arc<dyn CertVerifier>) -> Result<Self> {
        // rustls 0.23 needs a process-wide default crypto provider; installing
        // it here is idempotent and cheap if one is already set.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(CallbackVerifier(verifier)))
            .with_no_client_auth();

        let name = ServerName::try_from(server_name.to_string())
            .map_err(|e| Error::Tls(format!("invalid server name {server_name:?}: {e}")))?;
        let conn = ClientConnection::new(Arc::new(config), name)
            .map_err(|e| Error::Tls(format!("tls setup failed: {e}")))?;
        Ok(TlsStream {
            inner: StreamOwned::new(conn, stream),
        })
    }

    pub fn get_ref(&self) -> &TcpStream {
        self.inner.get_ref()
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
