// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Keyword-triggered library reference blocks.
//!
//! When a user prompt mentions a known mechanical component family, the
//! matching reference block is appended to the design system prompt so the
//! model reaches for the right CadQuery extension instead of hallucinating
//! geometry. Trigger keywords include the French vocabulary the original
//! user base writes in.

/// Keyword groups that trigger a library block.
const FASTENER_KEYWORDS: &[&str] = &[
    "screw", "bolt", "nut", "washer", "fastener", "vis", "écrou", "boulon", "rondelle",
];
const THREAD_KEYWORDS: &[&str] = &[
    "thread", "threading", "threaded", "filetage", "fileté", "taraudage",
];
const GEAR_KEYWORDS: &[&str] = &[
    "gear", "cog", "engrenage", "pignon", "crémaillère", "rack",
];
const BEARING_KEYWORDS: &[&str] = &["bearing", "roulement", "palier"];
const GRIDFINITY_KEYWORDS: &[&str] = &[
    "gridfinity", "bin", "organizer", "rangement", "casier",
];
const CHAIN_KEYWORDS: &[&str] = &["chain", "chaîne", "maillon"];

const LIBRARY_ENHANCEMENT_PREAMBLE: &str = r#"## AVAILABLE COMPONENT LIBRARIES

The request mentions standard mechanical components. Use the reference
patterns below instead of modeling these from raw primitives.
"#;

const CQ_WAREHOUSE_PATTERNS: &str = r#"## cq-warehouse - Fasteners, Bearings, Threads

cq-warehouse provides prebuilt parametric mechanical components.

### Import
```python
import cadquery as cq
from cq_warehouse.fastener import SocketHeadCapScrew, HexNut, CounterSunkScrew
from cq_warehouse.bearing import SingleRowDeepGrooveBallBearing
from cq_warehouse.thread import IsoThread
```

### Fasteners
```python
# M5x20 socket head cap screw
screw = SocketHeadCapScrew(size="M5-0.8", length=20, fastener_type="iso4762")

# M5 hex nut
nut = HexNut(size="M5-0.8", fastener_type="iso4032")

# Matching clearance holes in a plate:
plate = (
    cq.Workplane("XY")
    .box(50, 50, 10)
    .faces(">Z")
    .workplane()
    .clearanceHole(fastener=screw, fit="Normal", counterSunk=False)
)
result = plate
```

### Threads
```python
# External M10 thread, 20mm long
external_thread = IsoThread(major_diameter=10, pitch=1.5, length=20, external=True)

base = cq.Workplane("XY").cylinder(20, 5)
result = base.union(external_thread.cq_object.translate((0, 0, 20)))
```

### Bearings
```python
# 608 skateboard bearing: 8mm bore, 22mm OD, 7mm width
bearing = SingleRowDeepGrooveBallBearing(size="M8-22-7", bearing_type="SKT")

housing = (
    cq.Workplane("XY")
    .cylinder(15, bearing.bearing_dict["d2"] / 2 + 3)
    .faces(">Z")
    .workplane()
    .hole(bearing.bearing_dict["d2"])
)
result = housing
```

### Standard fastener sizes
- **ISO 4762**: socket head cap screws - M2 to M24
- **ISO 4032**: hex nuts - M2 to M24
- **ISO 10642**: countersunk screws - M3 to M20
- **ISO 7380**: button head screws - M3 to M12
"#;

const CQ_GEARS_PATTERNS: &str = r#"## cq_gears - Parametric Gears

cq_gears builds involute spur, herringbone, bevel and ring gears.

### Import
```python
import cadquery as cq
from cq_gears import SpurGear, HerringboneGear, BevelGear, RingGear
```

### Spur gear
```python
# module 2, 20 teeth, 10mm wide, 5mm bore
gear = SpurGear(module=2.0, teeth_number=20, width=10.0, bore_d=5.0)
result = cq.Workplane("XY").gear(gear)
```

### Meshing pair
```python
pinion = SpurGear(module=1.5, teeth_number=12, width=8.0, bore_d=4.0)
wheel = SpurGear(module=1.5, teeth_number=36, width=8.0, bore_d=6.0)

# center distance = module * (z1 + z2) / 2
center = 1.5 * (12 + 36) / 2
result = (
    cq.Workplane("XY")
    .gear(pinion)
    .union(cq.Workplane("XY").gear(wheel).translate((center, 0, 0)))
)
```

Herringbone gears print without supports and run quieter; prefer them for
printed gearboxes over helical gears.
"#;

const CQ_GRIDFINITY_PATTERNS: &str = r#"## Gridfinity - Modular Storage Bins

Gridfinity bins snap onto a 42x42mm baseplate grid; height is counted in
7mm units.

### Bin body
```python
import cadquery as cq

grid_x = 2          # units of 42mm
grid_y = 1
height_units = 3    # units of 7mm
wall = 1.2

outer_x = grid_x * 42.0 - 0.5
outer_y = grid_y * 42.0 - 0.5
height = height_units * 7.0

bin_body = (
    cq.Workplane("XY")
    .box(outer_x, outer_y, height, centered=(True, True, False))
    .edges("|Z")
    .fillet(3.75)
    .faces(">Z")
    .shell(-wall)
)
result = bin_body
```

### Base profile
The standardized base is a stepped profile per 42mm cell: 0.8mm straight,
1.8mm at 45 degrees, 2.15mm straight. Cut it from the bin footprint so the
bin seats onto the baseplate.
"#;

struct TriggerGroup {
    keywords: &'static [&'static str],
    block: &'static str,
}

/// Scan the prompt and return the enhancement section for every matched
/// component family, deduplicated. Empty string when nothing matches.
pub fn get_relevant_patterns(prompt: &str) -> String {
    let prompt_lower = prompt.to_lowercase();

    let groups = [
        TriggerGroup {
            keywords: FASTENER_KEYWORDS,
            block: CQ_WAREHOUSE_PATTERNS,
        },
        TriggerGroup {
            keywords: THREAD_KEYWORDS,
            block: CQ_WAREHOUSE_PATTERNS,
        },
        TriggerGroup {
            keywords: GEAR_KEYWORDS,
            block: CQ_GEARS_PATTERNS,
        },
        TriggerGroup {
            keywords: BEARING_KEYWORDS,
            block: CQ_WAREHOUSE_PATTERNS,
        },
        TriggerGroup {
            keywords: GRIDFINITY_KEYWORDS,
            block: CQ_GRIDFINITY_PATTERNS,
        },
        TriggerGroup {
            keywords: CHAIN_KEYWORDS,
            block: CQ_WAREHOUSE_PATTERNS,
        },
    ];

    let mut blocks: Vec<&'static str> = Vec::new();
    for group in &groups {
        let matched = group
            .keywords
            .iter()
            .any(|keyword| prompt_lower.contains(keyword));
        if matched && !blocks.contains(&group.block) {
            blocks.push(group.block);
        }
    }

    if blocks.is_empty() {
        return String::new();
    }

    format!("{LIBRARY_ENHANCEMENT_PREAMBLE}\n{}", blocks.join("\n\n"))
}

/// All library blocks, for comprehensive generation.
pub fn get_all_patterns() -> String {
    format!(
        "{LIBRARY_ENHANCEMENT_PREAMBLE}\n{}",
        [
            CQ_WAREHOUSE_PATTERNS,
            CQ_GEARS_PATTERNS,
            CQ_GRIDFINITY_PATTERNS
        ]
        .join("\n\n")
    )
}
