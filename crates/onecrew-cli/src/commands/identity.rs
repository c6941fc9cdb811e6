use anyhow::{Result, anyhow};
use onecrew_core::identity::{DomainIdentity, IdentityTranslator, ParticipantKind};

pub fn encode(translator: &IdentityTranslator, kind: ParticipantKind, id: &str) {
    println!("{}", translator.to_provider_user_id(id, kind));
}

pub fn decode(translator: &IdentityTranslator, provider_id: &str) -> Result<()> {
    let identity = decode_identity(translator, provider_id)?;
    println!("{}", identity);
    Ok(())
}

fn decode_identity(translator: &IdentityTranslator, provider_id: &str) -> Result<DomainIdentity> {
    translator.from_provider_user_id(provider_id).ok_or_else(|| {
        anyhow!(
            "'{}' is not a '{}' provider user id",
            provider_id,
            translator.prefix()
        )
    })
}
