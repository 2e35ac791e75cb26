pub mod cloudinary;
pub mod razorpay;
pub mod smtp;
