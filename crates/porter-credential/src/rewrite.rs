use std::collections::BTreeMap;

use tracing::debug;

use porter_types::LegacyCredential;

use crate::scheme::CredentialScheme;
use crate::tagged::TaggedCredential;

/// Re-encode a legacy password hash as a tagged credential.
///
/// Never fails. Unknown schemes and input that could not be verified later
/// (empty hash, missing salt or parameter, a hash of the wrong shape, or a
/// hash or parameter that would break the tagged encoding) produce
/// [`TaggedCredential::Unresolved`].
pub fn rewrite(
    scheme_tag: &str,
    hash: &str,
    salt: &str,
    params: &BTreeMap<String, String>,
) -> TaggedCredential {
    let Some(scheme) = CredentialScheme::from_tag(scheme_tag) else {
        debug!(scheme = scheme_tag, "unknown credential scheme");
        return TaggedCredential::Unresolved;
    };

    let hash = hash.trim();
    if hash.is_empty() || hash.contains(':') {
        debug!(%scheme, "credential hash cannot be encoded");
        return TaggedCredential::Unresolved;
    }
    if !scheme.accepts_hash(hash) {
        debug!(%scheme, "credential hash has the wrong shape");
        return TaggedCredential::Unresolved;
    }
    if scheme.requires_salt() && salt.is_empty() {
        debug!(%scheme, "credential salt missing");
        return TaggedCredential::Unresolved;
    }
    if let Some(missing) = scheme
        .required_params()
        .iter()
        .find(|key| params.get(**key).map_or(true, |v| v.is_empty()))
    {
        debug!(%scheme, param = *missing, "credential parameter missing");
        return TaggedCredential::Unresolved;
    }
    let reserved = |s: &str| s.is_empty() || s.contains([':', ',', '=']);
    if params.iter().any(|(k, v)| reserved(k) || reserved(v)) {
        debug!(%scheme, "credential parameters cannot be encoded");
        return TaggedCredential::Unresolved;
    }

    TaggedCredential::Tagged {
        scheme,
        hash: hash.to_string(),
        salt: salt.to_string(),
        params: params.clone(),
    }
}

/// [`rewrite`] for a credential attached to an export record.
pub fn rewrite_legacy(credential: &LegacyCredential) -> TaggedCredential {
    rewrite(
        &credential.scheme,
        &credential.hash,
        &credential.salt,
        &credential.params,
    )
}
