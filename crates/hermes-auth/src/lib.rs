//! # Hermes Auth
//!
//! Auth scheme selection, identity resolution and signing.
//!
//! Per attempt the runtime calls [`resolve_auth`] with the operation's
//! candidate scheme ids. It:
//!
//! 1. orders the candidates by the context's auth-scheme preference, if any;
//! 2. picks the first scheme the client implements **and** has an
//!    [`IdentityResolver`] for;
//! 3. resolves the identity (an `await` point);
//! 4. runs the scheme's signing-property hook.
//!
//! The returned [`ResolvedAuth`] then signs the request.
//!
//! | Scheme id | Scheme | Signer | Identity |
//! |-----------|--------|--------|----------|
//! | `aws.auth#sigv4` | [`SigV4AuthScheme`] | [`SigV4Signer`] | `Credentials` |
//! | `smithy.api#httpBearerAuth` | [`BearerAuthScheme`] | [`BearerTokenSigner`] | `BearerToken` |
//! | `smithy.api#noAuth` | [`NoAuthScheme`] | [`AnonymousSigner`] | `Anonymous` |

#![doc(html_root_url = "https://docs.rs/hermes-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod identity;
pub mod properties;
mod resolve;
mod scheme;
mod signer;
pub mod sigv4;

pub use identity::{CachingIdentityResolver, IdentityResolver, IdentityResolvers, StaticIdentityResolver};
pub use resolve::{order_candidates, resolve_auth, ResolvedAuth};
pub use scheme::{
    short_name, AuthScheme, AuthSchemes, BearerAuthScheme, NoAuthScheme, SigV4AuthScheme,
    HTTP_BEARER_SCHEME_ID, NO_AUTH_SCHEME_ID, SIGV4_SCHEME_ID,
};
pub use signer::{expect_identity, AnonymousSigner, BearerTokenSigner, Signer};
pub use sigv4::{SigV4Signer, SignatureCalculator, SigningScope};
