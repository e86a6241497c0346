//! Registre EPSG embarqué (définitions WKT1)
//!
//! Couvre les systèmes courants sans dépendance à la base PROJ:
//! - Géographiques: 4326 (WGS 84), 4258 (ETRS89), 4171 (RGF93), 4269 (NAD83)
//! - Géocentrique: 4978 (WGS 84)
//! - Projetés: 2154 (Lambert 93), 3942-3950 (CC42-CC50), 3857 (Web Mercator),
//!   32601-32660 / 32701-32760 (UTM WGS 84), 25828-25838 (UTM ETRS89)
//! - Vertical: 5773 (EGM96 height)

const WGS84_GEOGCS: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#;

const ETRS89_GEOGCS: &str = r#"GEOGCS["ETRS89",DATUM["European_Terrestrial_Reference_System_1989",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6258"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4258"]]"#;

const RGF93_GEOGCS: &str = r#"GEOGCS["RGF93",DATUM["Reseau_Geodesique_Francais_1993",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6171"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4171"]]"#;

const NAD83_GEOGCS: &str = r#"GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4269"]]"#;

const WGS84_GEOCCS: &str = r#"GEOCCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0],UNIT["metre",1],AXIS["Geocentric X",OTHER],AXIS["Geocentric Y",OTHER],AXIS["Geocentric Z",NORTH],AUTHORITY["EPSG","4978"]]"#;

const EGM96_VERT_CS: &str = r#"VERT_CS["EGM96 height",VERT_DATUM["EGM96 geoid",2005,AUTHORITY["EPSG","5171"]],UNIT["metre",1],AXIS["Gravity-related height",UP],AUTHORITY["EPSG","5773"]]"#;

/// Vérifie si un code EPSG est présent dans le registre
pub fn is_supported(code: u32) -> bool {
    matches!(
        code,
        4326 | 4258 | 4171 | 4269 | 4978 | 5773 | 2154 | 3857
            | 3942..=3950
            | 32601..=32660
            | 32701..=32760
            | 25828..=25838
    )
}

/// Définition WKT1 d'un code EPSG
pub fn definition(code: u32) -> Option<String> {
    let wkt = match code {
        4326 => WGS84_GEOGCS.to_string(),
        4258 => ETRS89_GEOGCS.to_string(),
        4171 => RGF93_GEOGCS.to_string(),
        4269 => NAD83_GEOGCS.to_string(),
        4978 => WGS84_GEOCCS.to_string(),
        5773 => EGM96_VERT_CS.to_string(),
        2154 => lambert_conic(
            "RGF93 / Lambert-93",
            RGF93_GEOGCS,
            (49.0, 44.0),
            46.5,
            3.0,
            (700000.0, 6600000.0),
            code,
        ),
        3942..=3950 => {
            // Coniques conformes 9 zones: zone n centrée sur n°N, parallèles n ± 0.75
            let zone = (code - 3900) as f64;
            lambert_conic(
                &format!("RGF93 / CC{}", code - 3900),
                RGF93_GEOGCS,
                (zone - 0.75, zone + 0.75),
                zone,
                3.0,
                (1700000.0, (zone - 41.0) * 1000000.0 + 200000.0),
                code,
            )
        }
        3857 => format!(
            r#"PROJCS["WGS 84 / Pseudo-Mercator",{},PROJECTION["Popular_Visualisation_Pseudo_Mercator"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1],AUTHORITY["EPSG","3857"]]"#,
            WGS84_GEOGCS
        ),
        32601..=32660 => utm("WGS 84", WGS84_GEOGCS, code - 32600, false, code),
        32701..=32760 => utm("WGS 84", WGS84_GEOGCS, code - 32700, true, code),
        25828..=25838 => utm("ETRS89", ETRS89_GEOGCS, code - 25800, false, code),
        _ => return None,
    };
    Some(wkt)
}

fn lambert_conic(
    name: &str,
    geogcs: &str,
    parallels: (f64, f64),
    latitude_of_origin: f64,
    central_meridian: f64,
    false_origin: (f64, f64),
    code: u32,
) -> String {
    format!(
        r#"PROJCS["{}",{},PROJECTION["Lambert_Conformal_Conic_2SP"],PARAMETER["standard_parallel_1",{}],PARAMETER["standard_parallel_2",{}],PARAMETER["latitude_of_origin",{}],PARAMETER["central_meridian",{}],PARAMETER["false_easting",{}],PARAMETER["false_northing",{}],UNIT["metre",1],AUTHORITY["EPSG","{}"]]"#,
        name,
        geogcs,
        parallels.0,
        parallels.1,
        latitude_of_origin,
        central_meridian,
        false_origin.0,
        false_origin.1,
        code
    )
}

fn utm(datum_name: &str, geogcs: &str, zone: u32, south: bool, code: u32) -> String {
    let central_meridian = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;
    let false_northing = if south { 10000000.0 } else { 0.0 };
    format!(
        r#"PROJCS["{} / UTM zone {}{}",{},PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",{}],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],PARAMETER["false_northing",{}],UNIT["metre",1],AUTHORITY["EPSG","{}"]]"#,
        datum_name,
        zone,
        if south { "S" } else { "N" },
        geogcs,
        central_meridian,
        false_northing,
        code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{classify, CoordinateReferenceSystem, CrsType, ProjectionMethod};

    #[test]
    fn test_every_supported_code_parses() {
        let codes = [4326, 4258, 4171, 4269, 4978, 5773, 2154, 3857, 3942, 3950, 32601, 32660, 32701, 32760, 25828, 25838];
        for code in codes {
            assert!(is_supported(code));
            let crs = CoordinateReferenceSystem::from_epsg(code)
                .unwrap_or_else(|e| panic!("EPSG:{} failed: {}", code, e));
            assert!(classify(&crs).is_some(), "EPSG:{}", code);
            if code != 5773 {
                assert_eq!(crs.epsg(), Some(code));
            }
        }
    }

    #[test]
    fn test_unsupported() {
        assert!(!is_supported(9999));
        assert!(definition(32661).is_none());
    }

    #[test]
    fn test_cc46_parameters() {
        let CoordinateReferenceSystem::Projected(p) =
            CoordinateReferenceSystem::from_epsg(3946).unwrap()
        else {
            panic!("Expected projected CRS");
        };
        assert_eq!(p.name, "RGF93 / CC46");
        assert_eq!(p.projection.parameters.standard_parallel_1, Some(45.25));
        assert_eq!(p.projection.parameters.standard_parallel_2, Some(46.75));
        assert_eq!(p.projection.parameters.false_northing, 5200000.0);
    }

    #[test]
    fn test_utm_south() {
        let CoordinateReferenceSystem::Projected(p) =
            CoordinateReferenceSystem::from_epsg(32740).unwrap()
        else {
            panic!("Expected projected CRS");
        };
        assert_eq!(p.name, "WGS 84 / UTM zone 40S");
        assert_eq!(p.projection.method, ProjectionMethod::TransverseMercator);
        assert_eq!(p.projection.parameters.central_meridian, 57.0);
        assert_eq!(p.projection.parameters.false_northing, 10000000.0);
        assert_eq!(
            classify(&CoordinateReferenceSystem::Projected(p)),
            Some(CrsType::Projected)
        );
    }
}
