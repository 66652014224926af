//! SOCKS5 method negotiation
//!
//! Only "no authentication required" is ever selected. By default the
//! server commits to it whatever the client offered; [`MethodPolicy::RequireNoAuth`]
//! turns that into a strict check.

use super::codec::{read_greeting, write_method_selection};
use super::consts::*;
use crate::error::Socks5Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// How the negotiator treats the client's offered methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodPolicy {
    /// Select no-auth regardless of what was offered
    #[default]
    AcceptAny,
    /// Select no-auth only if the client offered it
    RequireNoAuth,
}

impl MethodPolicy {
    /// Policy for the `require_no_auth` configuration switch
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            MethodPolicy::RequireNoAuth
        } else {
            MethodPolicy::AcceptAny
        }
    }

    /// Method to answer with for the offered list
    pub fn select(self, methods: &[u8]) -> u8 {
        match self {
            MethodPolicy::AcceptAny => SOCKS5_AUTH_METHOD_NONE,
            MethodPolicy::RequireNoAuth if methods.contains(&SOCKS5_AUTH_METHOD_NONE) => {
                SOCKS5_AUTH_METHOD_NONE
            }
            MethodPolicy::RequireNoAuth => SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE,
        }
    }
}

/// Read the greeting and answer with the selected method
///
/// Performs exactly one write. Returns once the connection is committed to
/// no-auth; a rejected client gets `VER 0xFF` before the error is returned.
pub async fn negotiate<S>(stream: &mut S, policy: MethodPolicy) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let methods = read_greeting(stream).await?;
    let selected = policy.select(&methods);

    write_method_selection(stream, selected).await?;

    if selected == SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE {
        return Err(Socks5Error::NoAcceptableMethod(methods));
    }

    debug!("Negotiated no-auth, client offered {:?}", methods);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_accept_any_ignores_offer() {
        let policy = MethodPolicy::AcceptAny;
        assert_eq!(policy.select(&[]), SOCKS5_AUTH_METHOD_NONE);
        assert_eq!(
            policy.select(&[SOCKS5_AUTH_METHOD_PASSWORD]),
            SOCKS5_AUTH_METHOD_NONE
        );
    }

    #[test]
    fn test_require_no_auth() {
        let policy = MethodPolicy::from_strict(true);
        assert_eq!(
            policy.select(&[SOCKS5_AUTH_METHOD_PASSWORD, SOCKS5_AUTH_METHOD_NONE]),
            SOCKS5_AUTH_METHOD_NONE
        );
        assert_eq!(
            policy.select(&[SOCKS5_AUTH_METHOD_GSSAPI]),
            SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE
        );
    }

    #[tokio::test]
    async fn test_negotiate_any_method_list() {
        for methods in [vec![], vec![0x00], vec![0x02], (0..=254u8).collect::<Vec<_>>()] {
            let (mut client, mut server) = duplex(1024);

            let mut greeting = vec![SOCKS5_VERSION, methods.len() as u8];
            greeting.extend_from_slice(&methods);
            greeting.push(0xEE);
            client.write_all(&greeting).await.unwrap();

            negotiate(&mut server, MethodPolicy::AcceptAny).await.unwrap();

            let mut reply = [0u8; 2];
            client.read_exact(&mut reply).await.unwrap();
            assert_eq!(reply, [0x05, 0x00]);

            // The sentinel after the method list is still unread
            let mut next = [0u8; 1];
            server.read_exact(&mut next).await.unwrap();
            assert_eq!(next, [0xEE]);
        }
    }

    #[tokio::test]
    async fn test_negotiate_single_write() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[SOCKS5_VERSION, 2, SOCKS5_AUTH_METHOD_GSSAPI, SOCKS5_AUTH_METHOD_NONE])
            .write(&[SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE])
            .build();

        negotiate(&mut stream, MethodPolicy::AcceptAny).await.unwrap();
    }

    #[tokio::test]
    async fn test_negotiate_strict_rejects() {
        let (mut client, mut server) = duplex(64);
        client
            .write_all(&[SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_PASSWORD])
            .await
            .unwrap();

        let err = negotiate(&mut server, MethodPolicy::RequireNoAuth)
            .await
            .unwrap_err();
        assert!(matches!(err, Socks5Error::NoAcceptableMethod(ref m) if m == &[2]));

        let mut reply = [0u8; 2];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0x05, 0xFF]);
    }

    #[tokio::test]
    async fn test_negotiate_wrong_version_writes_nothing() {
        let (mut client, mut server) = duplex(64);
        client.write_all(&[0x04, 1, 0x00]).await.unwrap();

        let err = negotiate(&mut server, MethodPolicy::AcceptAny)
            .await
            .unwrap_err();
        assert!(matches!(err, Socks5Error::ProtocolVersionMismatch(4)));

        drop(server);
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_negotiate_client_gone() {
        let (client, mut server) = duplex(64);
        drop(client);

        let err = negotiate(&mut server, MethodPolicy::AcceptAny)
            .await
            .unwrap_err();
        assert!(matches!(err, Socks5Error::MalformedFrame(_)));
    }
}
