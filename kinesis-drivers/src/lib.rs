//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in kinesis-core:
//!
//! - Step/direction motors driven by any [`StepOutput`](kinesis_core::traits::StepOutput)
//! - PWM spindle / laser power output
//! - Distance-synchronized power interpolation

#![no_std]
#![deny(unsafe_code)]

pub mod motor;
pub mod spindle;
