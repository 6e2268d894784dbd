#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub code_num: u16,
    pub message: &'static str,
}

impl Status {
    pub const OK: Status = Status {
        code_num: 200,
        message: "OK",
    };
}
