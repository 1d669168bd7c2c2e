//! Auth scheme selection and identity resolution.

use crate::identity::IdentityResolvers;
use crate::scheme::{short_name, AuthScheme, AuthSchemes};
use hermes_core::{Attributes, AuthError, Context, Identity, RequestBuilder};
use std::sync::Arc;

/// The outcome of auth resolution for one attempt.
#[derive(Debug)]
pub struct ResolvedAuth {
    /// The selected scheme.
    pub scheme: Arc<dyn AuthScheme>,
    /// The resolved identity.
    pub identity: Identity,
    /// Properties produced by the scheme's hook.
    pub signing_properties: Attributes,
}

impl ResolvedAuth {
    /// The selected scheme id.
    pub fn scheme_id(&self) -> &str {
        self.scheme.scheme_id()
    }

    /// Signs `request` with the selected scheme's signer.
    pub fn sign(&self, request: &mut RequestBuilder) -> Result<(), AuthError> {
        self.scheme
            .signer()
            .sign(request, &self.identity, &self.signing_properties)
    }
}

/// Orders `candidates` by `preference`.
///
/// Without a preference the candidate order stands. With one, only candidates
/// named in it survive (by full id or by the short name after `#`), ordered by
/// their position in the preference list.
pub fn order_candidates<'a>(candidates: &'a [String], preference: Option<&[String]>) -> Result<Vec<&'a str>, AuthError> {
    let Some(preference) = preference else {
        return Ok(candidates.iter().map(String::as_str).collect());
    };

    let mut ordered: Vec<&str> = Vec::with_capacity(candidates.len());
    for preferred in preference {
        for candidate in candidates {
            let matches = candidate == preferred || short_name(candidate) == preferred;
            if matches && !ordered.contains(&candidate.as_str()) {
                ordered.push(candidate);
            }
        }
    }

    if ordered.is_empty() {
        return Err(AuthError::NoMatchingScheme {
            candidates: candidates.to_vec(),
            preference: preference.to_vec(),
        });
    }
    Ok(ordered)
}

/// Picks a scheme for the operation and resolves its identity.
///
/// The first candidate (after preference ordering) that the client both
/// implements and has an identity resolver for wins.
pub async fn resolve_auth(
    ctx: &Context,
    candidates: &[String],
    schemes: &AuthSchemes,
    resolvers: &IdentityResolvers,
) -> Result<ResolvedAuth, AuthError> {
    let ordered = order_candidates(candidates, ctx.auth_scheme_preference())?;

    let selected = ordered.iter().find_map(|scheme_id| {
        let scheme = schemes.get(scheme_id)?;
        let resolver = resolvers.get(scheme_id)?;
        Some((Arc::clone(scheme), Arc::clone(resolver)))
    });
    let Some((scheme, resolver)) = selected else {
        return Err(AuthError::NoIdentityResolver {
            candidates: ordered.iter().map(ToString::to_string).collect(),
        });
    };

    let scheme_id = scheme.scheme_id().to_string();
    tracing::debug!(auth_scheme = %scheme_id, "selected auth scheme");

    let identity_properties = scheme.identity_properties(ctx);
    let identity = resolver
        .resolve_identity(&identity_properties)
        .await
        .map_err(|source| AuthError::IdentityResolution {
            scheme_id: scheme_id.clone(),
            source,
        })?;

    let mut signing_properties = Attributes::new();
    scheme.customize_signing_properties(ctx, &mut signing_properties)?;

    Ok(ResolvedAuth {
        scheme,
        identity,
        signing_properties,
    })
}
