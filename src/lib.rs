// SPDX-License-Identifier: MIT

pub mod axon;
