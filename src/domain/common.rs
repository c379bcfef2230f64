/// Exposes the key a value is stored under on the remote list or in a dropdown.
pub trait Keyed {
    fn key(&self) -> String;
}

/// Supplies a presentation-ready label for UI or logs.
pub trait Displayable {
    fn display_label(&self) -> String;
}

