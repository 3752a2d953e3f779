//! IMAP connection and TLS helpers
//!
//! Walks a session through its stages: TCP connect, TLS (implicit or
//! via `STARTTLS`), `LOGIN`, then `SELECT`. Each failure names the
//! stage it happened in.

use crate::config::{ImapConfig, Security};
use crate::error::{Error, Result};
use async_imap::Session;
use async_imap::imap_proto::{Response, Status};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use std::fmt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

/// A TLS-wrapped, authenticated IMAP session.
pub type ImapSession = Session<Compat<TlsStream<TcpStream>>>;

/// Build the TLS connector for `config`.
///
/// Certificates are checked against the Mozilla root set unless
/// `accept_invalid_certs` is set.
fn tls_connector(config: &ImapConfig) -> Result<TlsConnector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("Invalid TLS configuration: {e}")))?;

    let tls_config = if config.accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(provider)))
            .with_no_client_auth()
    } else {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    };

    Ok(TlsConnector::from(Arc::new(tls_config)))
}

/// TCP connect and secure the stream according to `config.security`.
async fn open_stream(config: &ImapConfig) -> Result<TlsStream<TcpStream>> {
    debug!(
        host = %config.host,
        port = config.port,
        security = %config.security,
        "Connecting to IMAP server"
    );

    let tcp_stream = TcpStream::connect((config.host.as_str(), config.port)).await?;

    let connector = tls_connector(config)?;
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    let stream = match config.security {
        Security::Tls => tcp_stream,
        Security::StartTls => {
            let mut client = async_imap::Client::new(tcp_stream.compat());
            read_greeting(&mut client).await?;
            client
                .run_command_and_check_ok("STARTTLS", None)
                .await
                .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;
            client.into_inner().into_inner()
        }
    };

    connector
        .connect(server_name, stream)
        .await
        .map_err(|e| Error::Tls(format!("TLS handshake failed: {e}")))
}

/// Open a fresh TLS-wrapped IMAP session and log in.
///
/// # Errors
///
/// Returns [`Error::Io`] or [`Error::Tls`] if the connection cannot be
/// established, [`Error::Imap`] if the server closes it or greets with
/// `BYE`, and [`Error::Auth`] if the server rejects the credentials. A
/// rejected login is followed by a best-effort `LOGOUT`.
pub async fn connect(config: &ImapConfig) -> Result<ImapSession> {
    let tls_stream = open_stream(config).await?;
    let mut client = async_imap::Client::new(tls_stream.compat());

    if config.security == Security::Tls {
        // With STARTTLS the greeting was read before the upgrade.
        read_greeting(&mut client).await?;
    }

    let session = match client.login(&config.username, &config.password).await {
        Ok(session) => session,
        Err((e, mut client)) => {
            client.run_command_and_check_ok("LOGOUT", None).await.ok();
            return Err(Error::Auth(e.to_string()));
        }
    };

    info!(host = %config.host, "Logged in to IMAP server");
    Ok(session)
}

/// Read the server greeting and refuse to go on after a `BYE`.
async fn read_greeting<T>(client: &mut async_imap::Client<T>) -> Result<()>
where
    T: futures::AsyncRead + futures::AsyncWrite + Unpin + fmt::Debug + Send,
{
    let Some(greeting) = client.read_response().await? else {
        return Err(Error::Imap("Connection closed before greeting".into()));
    };

    if let Response::Data {
        status: Status::Bye,
        information,
        ..
    } = greeting.parsed()
    {
        return Err(Error::Imap(format!(
            "Server refused connection: {}",
            information.as_deref().unwrap_or("BYE")
        )));
    }
    Ok(())
}

/// SELECT a mailbox on an existing session.
///
/// # Errors
///
/// Returns [`Error::Imap`] if the mailbox cannot be selected.
pub async fn select(session: &mut ImapSession, mailbox: &str) -> Result<()> {
    let selected = session
        .select(mailbox)
        .await
        .map_err(|e| Error::Imap(format!("Failed to select {mailbox}: {e}")))?;
    debug!(mailbox, exists = selected.exists, "Mailbox selected");
    Ok(())
}

/// Certificate verifier that accepts any server certificate, for
/// local bridges and test servers with self-signed certificates.
#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
