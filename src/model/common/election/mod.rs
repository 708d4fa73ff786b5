/// Our election IDs are the opaque document keys chosen when the election was created.
pub type ElectionId = String;
/// Our options are addressed by their position in the election's option list.
pub type OptionIndex = u32;

/// Option zero is reserved for abstaining, and absorbs voters whose delegation
/// had to be broken.
pub const ABSTAIN: OptionIndex = 0;
