use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Surcharge for wrapping tape, whether as the only packaging or on top of a container.
pub const COST_TAPE: u64 = 1;
pub const COST_PACKAGE: u64 = 5;
pub const COST_BOX: u64 = 20;

/// Weight ceilings in grams.
pub const PACKAGE_MAX_WEIGHT: u64 = 10_000;
pub const BOX_MAX_WEIGHT: u64 = 30_000;

/// The container a parcel is handed over in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    #[default]
    Default,
    Package,
    Box,
    Tape,
}

impl PackageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageKind::Default => "default",
            PackageKind::Package => "package",
            PackageKind::Box => "box",
            PackageKind::Tape => "tape",
        }
    }

    pub fn surcharge(self) -> u64 {
        match self {
            PackageKind::Default => 0,
            PackageKind::Package => COST_PACKAGE,
            PackageKind::Box => COST_BOX,
            PackageKind::Tape => COST_TAPE,
        }
    }

    pub fn max_weight(self) -> Option<u64> {
        match self {
            PackageKind::Package => Some(PACKAGE_MAX_WEIGHT),
            PackageKind::Box => Some(BOX_MAX_WEIGHT),
            PackageKind::Default | PackageKind::Tape => None,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageKind {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "default" => Ok(PackageKind::Default),
            "package" => Ok(PackageKind::Package),
            "box" => Ok(PackageKind::Box),
            "tape" => Ok(PackageKind::Tape),
            other => Err(OrderError::WrongInput(format!(
                "{other} isn't a package kind"
            ))),
        }
    }
}

/// A package kind plus the optional extra wrap.
///
/// Built once at accept time; the cost it computes is frozen into the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Packaging {
    kind: PackageKind,
    wrapped: bool,
}

impl Packaging {
    pub fn new(kind: PackageKind) -> Self {
        Self {
            kind,
            wrapped: false,
        }
    }

    /// Builds the packaging and applies the extra wrap when requested.
    pub fn with_wrap(kind: PackageKind, wrap: bool) -> Result<Self> {
        let mut packaging = Self::new(kind);
        if wrap {
            packaging.wrap()?;
        }
        Ok(packaging)
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    pub fn wrap(&mut self) -> Result<()> {
        if self.kind == PackageKind::Tape {
            return Err(OrderError::WrongInput("can't use tape twice".to_string()));
        }
        if self.wrapped {
            return Err(OrderError::WrongInput(format!(
                "{} is already wrapped",
                self.kind
            )));
        }
        self.wrapped = true;
        Ok(())
    }

    /// Whether the parcel ends up taped, either as tape-only packaging or with an extra wrap.
    pub fn is_taped(&self) -> bool {
        self.wrapped || self.kind == PackageKind::Tape
    }

    pub fn cost(&self, weight: u64, base_cost: u64) -> Result<u64> {
        if let Some(limit) = self.kind.max_weight()
            && weight > limit
        {
            return Err(OrderError::WrongInput(format!(
                "max weight for {} is {limit}gr",
                self.kind
            )));
        }

        let wrap = if self.wrapped { COST_TAPE } else { 0 };
        base_cost
            .checked_add(self.kind.surcharge() + wrap)
            .ok_or_else(|| OrderError::WrongInput(format!("cost {base_cost} is too large")))
    }
}

/// Human label of the packaging as it is shown to clients.
pub fn package_label(kind: PackageKind, use_tape: bool) -> String {
    match kind {
        PackageKind::Package | PackageKind::Box if use_tape => format!("taped {kind}"),
        _ => kind.to_string(),
    }
}
