//! Publications referenced by the bundled records.

use crate::game::Publication;

/// Experimental G14 paper; attached to the superconducting experiments.
pub fn g14_paper() -> Publication {
    Publication {
        citation: "J. Furches et al 2025 Quantum Sci. Technol. 10 045002".into(),
        url: "https://iopscience.iop.org/article/10.1088/2058-9565/adf1c0".into(),
    }
}

/// Paper defining the G14 game.
pub fn oddities_paper() -> Publication {
    Publication {
        citation: "L. Mančinska and D. E. Roberson, Baltic Journal on Modern Computing, \
                   4(4), 846-859, 2016"
            .into(),
        url: "https://arxiv.org/abs/1801.03542".into(),
    }
}
