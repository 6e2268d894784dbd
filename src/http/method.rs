use strum::{Display, EnumString, IntoStaticStr};

#[derive(EnumString, IntoStaticStr, Display, Debug, PartialEq, Eq, Clone, Copy)]
#[strum(ascii_case_insensitive)]
pub enum Method {
    #[strum(serialize = "GET")]
    GET,
    #[strum(serialize = "POST")]
    POST,
    #[strum(serialize = "PUT")]
    PUT,
    #[strum(serialize = "DELETE")]
    DELETE,
}
