// Support-package allocation.
//
// A package is a fixed bundle of `package_size` spearmen plus the same
// number of swordsmen. Packages are drawn greedily from source villages
// in ascending name order (villages are conventionally named "0001",
// "0002", ... so this yields a plan the operator can audit) until the
// requested count is met or supply runs out. Shortfall is reported as
// data, never as an error.

use serde::{Deserialize, Serialize};

/// A source village's currently available unit counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VillageSupply {
    pub village_id: String,
    pub village_name: String,
    /// Map coordinates, e.g. "512|489".
    pub coordinates: String,
    pub spear_available: i64,
    pub sword_available: i64,
}

/// The operator's intent: how many packages, how big, and how much any
/// single village may contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    /// Number of packages desired.
    pub package_count: i64,
    /// Units of EACH troop type per package.
    pub package_size: i64,
    /// Hard ceiling on units of each type drawn from one village.
    pub max_units_per_village: i64,
}

/// One line of the allocation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VillageAllocation {
    pub village_name: String,
    pub village_id: String,
    pub coordinates: String,
    pub packages_from_village: i64,
    pub spear_to_send: i64,
    pub sword_to_send: i64,
}

/// The full allocation plan plus its validity/shortfall report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResult {
    /// Only villages contributing at least one package appear here.
    pub allocations: Vec<VillageAllocation>,
    /// True iff the full requested count was satisfied.
    pub is_valid: bool,
    pub total_packages_allocated: i64,
    /// Requested minus allocated.
    pub missing_packages: i64,
    pub total_spear: i64,
    pub total_sword: i64,
}

impl AllocationResult {
    /// An empty, unsatisfied result reporting the whole request as missing.
    fn unsatisfied(package_count: i64) -> Self {
        AllocationResult {
            allocations: Vec::new(),
            is_valid: false,
            total_packages_allocated: 0,
            missing_packages: package_count,
            total_spear: 0,
            total_sword: 0,
        }
    }
}

/// Distribute the requested packages across `villages`.
///
/// Greedy single pass in ascending village-name order. The traversal
/// order decides WHICH villages supply the packages, but not how many
/// can be supplied in total: per-village capacity is an independent cap,
/// so `total_packages_allocated` and `is_valid` are order-free.
///
/// Non-positive `package_count`, `package_size` or `max_units_per_village`
/// short-circuits to an unsatisfied result. A request for zero packages
/// is deliberately reported as invalid, matching the panel's historical
/// behavior; callers that care must treat zero specially themselves.
pub fn allocate(villages: &[VillageSupply], request: &AllocationRequest) -> AllocationResult {
    let AllocationRequest {
        package_count,
        package_size,
        max_units_per_village,
    } = *request;

    if package_count <= 0 || package_size <= 0 || max_units_per_village <= 0 {
        return AllocationResult::unsatisfied(package_count);
    }

    let max_packages_per_village = max_units_per_village / package_size;

    // Stable sort keeps the original order for equal names.
    let mut sorted: Vec<&VillageSupply> = villages.iter().collect();
    sorted.sort_by(|a, b| a.village_name.cmp(&b.village_name));

    let mut remaining = package_count;
    let mut allocations = Vec::new();

    for village in sorted {
        if remaining <= 0 {
            break;
        }

        let spear_packages = village.spear_available / package_size;
        let sword_packages = village.sword_available / package_size;
        let available_packages = spear_packages
            .min(sword_packages)
            .min(max_packages_per_village);

        let take = available_packages.min(remaining);
        if take > 0 {
            allocations.push(VillageAllocation {
                village_name: village.village_name.clone(),
                village_id: village.village_id.clone(),
                coordinates: village.coordinates.clone(),
                packages_from_village: take,
                spear_to_send: take * package_size,
                sword_to_send: take * package_size,
            });
            remaining -= take;
        }
    }

    let total_spear: i64 = allocations.iter().map(|a| a.spear_to_send).sum();
    let total_sword: i64 = allocations.iter().map(|a| a.sword_to_send).sum();

    AllocationResult {
        allocations,
        is_valid: remaining == 0,
        total_packages_allocated: package_count - remaining,
        missing_packages: remaining,
        total_spear,
        total_sword,
    }
}

/// How many packages the villages could ever supply under the given
/// package size and per-village cap. Order-free sum of per-village caps.
pub fn total_available_packages(
    villages: &[VillageSupply],
    package_size: i64,
    max_units_per_village: i64,
) -> i64 {
    if package_size <= 0 || max_units_per_village <= 0 {
        return 0;
    }

    let max_packages_per_village = max_units_per_village / package_size;

    villages
        .iter()
        .map(|village| {
            let spear_packages = village.spear_available / package_size;
            let sword_packages = village.sword_available / package_size;
            spear_packages
                .min(sword_packages)
                .min(max_packages_per_village)
        })
        .sum()
}

/// Validate a destination village id as typed by the operator.
///
/// Village ids come from game URLs (e.g. `target=30707`): decimal digits
/// only after trimming whitespace, and strictly positive.
pub fn is_valid_village_id(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.bytes().all(|b| b.is_ascii_digit()) && trimmed.bytes().any(|b| b != b'0')
}

/// Parse a validated destination id to its numeric form for the dispatch
/// command. `None` when the id is invalid or out of range.
pub fn parse_village_id(candidate: &str) -> Option<i64> {
    let trimmed = candidate.trim();
    if !is_valid_village_id(trimmed) {
        return None;
    }
    trimmed.parse::<i64>().ok()
}
