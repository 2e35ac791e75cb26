pub mod auth_service;
pub use auth_service::{AuthError, AuthService, Authenticated, OtpIssued, UserInfo};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod order_service;
pub use order_service::{CheckoutInfo, OrderError, OrderInfo, OrderService};

pub mod order_service_impl;
pub use order_service_impl::SeaOrmOrderService;

pub mod otp;

pub mod token;
pub use token::{Claims, TokenError, TokenService};
