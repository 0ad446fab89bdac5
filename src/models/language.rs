#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Language {
    pub id: String,
    pub name: String,
}
