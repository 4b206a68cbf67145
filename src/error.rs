use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown skin: {name}")]
    UnknownSkin { name: String },

    #[error("unknown slot: {name}")]
    UnknownSlot { name: String },

    #[error("unknown attachment '{name}' for slot '{slot}'")]
    UnknownAttachment { slot: String, name: String },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[cfg(feature = "json")]
    #[error("failed to parse skeleton JSON: {message}")]
    JsonParse { message: String },

    #[cfg(feature = "json")]
    #[error("unknown parent bone '{parent}' for bone '{bone}'")]
    JsonUnknownBoneParent { bone: String, parent: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by slot '{slot}'")]
    JsonUnknownSlotBone { slot: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by {kind} constraint '{constraint}'")]
    JsonUnknownConstraintBone {
        kind: String,
        constraint: String,
        bone: String,
    },

    #[cfg(feature = "json")]
    #[error("unknown target slot '{slot}' referenced by path constraint '{constraint}'")]
    JsonUnknownPathConstraintSlot { constraint: String, slot: String },

    #[cfg(feature = "json")]
    #[error("unknown slot '{slot}' referenced by skin '{skin}'")]
    JsonUnknownSkinSlot { skin: String, slot: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by skin '{skin}'")]
    JsonUnknownSkinBone { skin: String, bone: String },
}
