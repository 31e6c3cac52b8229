use crate::prelude::*;

// Two rules for the same bucket and event must not both match one key;
// the provider rejects such configurations at deploy time.
pub fn validate_no_overlap(topology: &Topology, errs: &mut ErrorTree) {
    let rules = topology.notifications();

    for (i, a) in rules.iter().enumerate() {
        for b in &rules[i + 1..] {
            if a.bucket() == b.bucket() && a.event() == b.event() && a.filter().overlaps(b.filter())
            {
                err!(
                    errs,
                    "notifications on bucket '{}' for {} overlap: '{}*{}' -> '{}' and '{}*{}' -> '{}'",
                    a.bucket(),
                    a.event(),
                    a.filter().prefix_value(),
                    a.filter().suffix_value(),
                    a.target(),
                    b.filter().prefix_value(),
                    b.filter().suffix_value(),
                    b.target()
                );
            }
        }
    }
}
