use anyhow::{Result, bail};
use onecrew_core::identity::IdentityTranslator;

pub fn encode(translator: &IdentityTranslator, conversation_id: &str) {
    println!("{}", translator.to_channel_ref(conversation_id));
}

pub fn decode(translator: &IdentityTranslator, channel_ref: &str) -> Result<()> {
    match translator.from_channel_ref(channel_ref) {
        Some(conversation_id) => println!("{}", conversation_id),
        None => bail!("'{}' is not a messaging channel reference", channel_ref),
    }
    Ok(())
}
