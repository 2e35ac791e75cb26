pub mod auth {

    pub const OTP_EXPIRY_MINUTES: i64 = 10;

    pub const RESET_TOKEN_EXPIRY_MINUTES: i64 = 60;

    pub const MIN_PASSWORD_LENGTH: usize = 6;
}

pub mod roles {

    pub const USER: &str = "user";

    pub const ADMIN: &str = "admin";
}

pub mod payment {

    pub const STATUS_PENDING: &str = "pending";

    pub const STATUS_PAID: &str = "paid";
}

pub mod limits {

    pub const MAX_CART_QUANTITY: i32 = 99;

    pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
}
