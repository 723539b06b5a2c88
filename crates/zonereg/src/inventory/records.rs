//! CNAME, SRV, HINFO presets and the records that hang off a single host.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;
use zonereg_core::validate;
use zonereg_core::{
    Cname, CnameId, HinfoPreset, HinfoPresetId, HostId, Mx, MxId, Naptr, NaptrId, NewCname,
    NewHinfoPreset, NewMx, NewNaptr, NewSrv, NewSshfp, NewTxt, RegistryError, Result, Srv, SrvId,
    Sshfp, SshfpId, Txt, TxtId, ZoneId,
};

use super::{Audited, Inventory};
use crate::zones::{AffectedZones, Applied};

/// A record owned by one host and rendered under that host's name.
///
/// Create, update and delete are generic over this trait; the implementing
/// types only say how their input is validated and where their rows live.
pub trait HostRecord: Audited + Clone {
    type Id: Copy + Ord + From<u64> + Display;
    type New;

    /// Entity name in error messages
    const KIND: &'static str;

    fn id(&self) -> Self::Id;
    fn host(&self) -> HostId;

    /// FQDN of the owning host named by the input
    fn host_name(new: &Self::New) -> &str;

    /// Validate and canonicalize the input.
    fn normalize(new: Self::New) -> Result<Self::New>;

    fn build(id: Self::Id, host: HostId, new: Self::New) -> Self;

    /// Order in which a host's records of this type are rendered.
    fn render_order(&self, other: &Self) -> Ordering;

    fn table(inv: &Inventory) -> &BTreeMap<Self::Id, Self>;
    fn table_mut(inv: &mut Inventory) -> &mut BTreeMap<Self::Id, Self>;
}

impl HostRecord for Txt {
    type Id = TxtId;
    type New = NewTxt;
    const KIND: &'static str = "txt";

    fn id(&self) -> TxtId {
        self.id
    }

    fn host(&self) -> HostId {
        self.host
    }

    fn host_name(new: &NewTxt) -> &str {
        &new.host
    }

    fn normalize(new: NewTxt) -> Result<NewTxt> {
        Ok(NewTxt {
            txt: validate::txt("txt", &new.txt)?,
            ..new
        })
    }

    fn build(id: TxtId, host: HostId, new: NewTxt) -> Self {
        Self { id, host, txt: new.txt }
    }

    fn render_order(&self, other: &Self) -> Ordering {
        (&self.txt, self.id).cmp(&(&other.txt, other.id))
    }

    fn table(inv: &Inventory) -> &BTreeMap<TxtId, Self> {
        &inv.txts
    }

    fn table_mut(inv: &mut Inventory) -> &mut BTreeMap<TxtId, Self> {
        &mut inv.txts
    }
}

impl HostRecord for Mx {
    type Id = MxId;
    type New = NewMx;
    const KIND: &'static str = "mx";

    fn id(&self) -> MxId {
        self.id
    }

    fn host(&self) -> HostId {
        self.host
    }

    fn host_name(new: &NewMx) -> &str {
        &new.host
    }

    fn normalize(new: NewMx) -> Result<NewMx> {
        Ok(NewMx {
            mx: validate::hostname("mx", &new.mx)?,
            ..new
        })
    }

    fn build(id: MxId, host: HostId, new: NewMx) -> Self {
        Self {
            id,
            host,
            priority: new.priority,
            mx: new.mx,
        }
    }

    fn render_order(&self, other: &Self) -> Ordering {
        (self.priority, &self.mx).cmp(&(other.priority, &other.mx))
    }

    fn table(inv: &Inventory) -> &BTreeMap<MxId, Self> {
        &inv.mxs
    }

    fn table_mut(inv: &mut Inventory) -> &mut BTreeMap<MxId, Self> {
        &mut inv.mxs
    }
}

impl HostRecord for Naptr {
    type Id = NaptrId;
    type New = NewNaptr;
    const KIND: &'static str = "naptr";

    fn id(&self) -> NaptrId {
        self.id
    }

    fn host(&self) -> HostId {
        self.host
    }

    fn host_name(new: &NewNaptr) -> &str {
        &new.host
    }

    fn normalize(new: NewNaptr) -> Result<NewNaptr> {
        Ok(NewNaptr {
            flag: validate::naptr_flag("flag", &new.flag)?,
            replacement: validate::hostname("replacement", &new.replacement)?,
            ..new
        })
    }

    fn build(id: NaptrId, host: HostId, new: NewNaptr) -> Self {
        Self {
            id,
            host,
            order: new.order,
            preference: new.preference,
            flag: new.flag,
            service: new.service,
            regex: new.regex,
            replacement: new.replacement,
        }
    }

    fn render_order(&self, other: &Self) -> Ordering {
        (self.order, self.preference, self.id).cmp(&(other.order, other.preference, other.id))
    }

    fn table(inv: &Inventory) -> &BTreeMap<NaptrId, Self> {
        &inv.naptrs
    }

    fn table_mut(inv: &mut Inventory) -> &mut BTreeMap<NaptrId, Self> {
        &mut inv.naptrs
    }
}

impl HostRecord for Sshfp {
    type Id = SshfpId;
    type New = NewSshfp;
    const KIND: &'static str = "sshfp";

    fn id(&self) -> SshfpId {
        self.id
    }

    fn host(&self) -> HostId {
        self.host
    }

    fn host_name(new: &NewSshfp) -> &str {
        &new.host
    }

    fn normalize(new: NewSshfp) -> Result<NewSshfp> {
        Ok(NewSshfp {
            fingerprint: validate::sshfp(new.algorithm, new.hash_type, &new.fingerprint)?,
            ..new
        })
    }

    fn build(id: SshfpId, host: HostId, new: NewSshfp) -> Self {
        Self {
            id,
            host,
            algorithm: new.algorithm,
            hash_type: new.hash_type,
            fingerprint: new.fingerprint,
        }
    }

    fn render_order(&self, other: &Self) -> Ordering {
        (self.algorithm, self.hash_type, &self.fingerprint).cmp(&(
            other.algorithm,
            other.hash_type,
            &other.fingerprint,
        ))
    }

    fn table(inv: &Inventory) -> &BTreeMap<SshfpId, Self> {
        &inv.sshfps
    }

    fn table_mut(inv: &mut Inventory) -> &mut BTreeMap<SshfpId, Self> {
        &mut inv.sshfps
    }
}

impl Inventory {
    /// Zone owning the host `id`, if the host exists and is in one.
    fn zone_of_host(&self, id: HostId) -> Option<ZoneId> {
        self.hosts.get(&id).and_then(|h| h.zone)
    }

    /// Zone a CNAME alias or SRV name must live in.
    fn managed_zone_for(&self, field: &'static str, name: &str) -> Result<ZoneId> {
        self.index.zones.forward_zone_for(name).ok_or_else(|| {
            RegistryError::invalid(field, format!("{name} is not in a zone managed here"))
        })
    }

    pub fn record<R: HostRecord>(&self, id: R::Id) -> Result<&R> {
        R::table(self)
            .get(&id)
            .ok_or_else(|| RegistryError::not_found(R::KIND, id))
    }

    /// Records of type `R` owned by a host, in render order.
    pub fn records_of<R: HostRecord>(&self, host: HostId) -> Vec<&R> {
        let mut records: Vec<&R> = R::table(self)
            .values()
            .filter(|r| r.host() == host)
            .collect();
        records.sort_by(|a, b| a.render_order(b));
        records
    }

    /// Attach a record to the host named in `new`.
    pub fn create_record<R: HostRecord>(&mut self, new: R::New) -> Result<Applied<R>> {
        let host = self.host(R::host_name(&new))?.id;
        let new = R::normalize(new)?;

        let record = R::build(self.allocate(), host, new);
        R::table_mut(self).insert(record.id(), record.clone());
        self.saved(&record);
        tracing::info!(kind = R::KIND, id = %record.id(), "record created");

        let mut affected = AffectedZones::new();
        affected.insert_opt(self.zone_of_host(host));
        Ok(self.commit(record, affected))
    }

    /// Replace a record's data. The host may change with it.
    pub fn update_record<R: HostRecord>(&mut self, id: R::Id, new: R::New) -> Result<Applied<R>> {
        let old_host = self.record::<R>(id)?.host();
        let host = self.host(R::host_name(&new))?.id;
        let new = R::normalize(new)?;

        let record = R::build(id, host, new);
        R::table_mut(self).insert(id, record.clone());
        self.saved(&record);

        let mut affected = AffectedZones::new();
        affected.extend([self.zone_of_host(old_host), self.zone_of_host(host)]);
        Ok(self.commit(record, affected))
    }

    pub fn delete_record<R: HostRecord>(&mut self, id: R::Id) -> Result<Applied<R>> {
        let host = self.record::<R>(id)?.host();
        let Some(record) = R::table_mut(self).remove(&id) else {
            return Err(RegistryError::not_found(R::KIND, id));
        };
        self.deleted(&record);
        tracing::info!(kind = R::KIND, %id, "record deleted");

        let mut affected = AffectedZones::new();
        affected.insert_opt(self.zone_of_host(host));
        Ok(self.commit(record, affected))
    }

    fn remove_all_of<R: HostRecord>(&mut self, host: HostId) {
        let ids: Vec<R::Id> = R::table(self)
            .values()
            .filter(|r| r.host() == host)
            .map(|r| r.id())
            .collect();
        for id in ids {
            if let Some(record) = R::table_mut(self).remove(&id) {
                self.deleted(&record);
            }
        }
    }

    /// Delete every CNAME, SRV and host record that belongs to or targets
    /// `host`. Zone marking is the caller's job.
    pub(super) fn remove_records_of(&mut self, host: HostId) {
        self.remove_all_of::<Txt>(host);
        self.remove_all_of::<Mx>(host);
        self.remove_all_of::<Naptr>(host);
        self.remove_all_of::<Sshfp>(host);

        let cnames: Vec<Cname> = self.cnames_of(host).into_iter().cloned().collect();
        for cname in cnames {
            self.cnames.remove(&cname.id);
            self.index.cname_names.remove(&cname.name);
            self.deleted(&cname);
        }
        let srvs: Vec<Srv> = self.srvs_of(host).into_iter().cloned().collect();
        for srv in srvs {
            self.srvs.remove(&srv.id);
            self.deleted(&srv);
        }
    }

    // ----- cname --------------------------------------------------------

    /// Validate a CNAME input. `current` is the alias being replaced.
    fn check_cname(&self, new: &NewCname, current: Option<&str>) -> Result<Cname> {
        let name = validate::hostname("name", &new.name)?;
        if self.index.host_names.contains_key(&name) {
            return Err(RegistryError::Conflict(format!("{name} is already a host")));
        }
        if current != Some(name.as_str()) && self.index.cname_names.contains_key(&name) {
            return Err(RegistryError::Conflict(format!("cname {name} already exists")));
        }
        let zone = self.managed_zone_for("name", &name)?;
        let host = self.host(&new.host)?.id;
        self.check_ttl("ttl", new.ttl)?;
        Ok(Cname {
            id: CnameId(0),
            name,
            host,
            ttl: new.ttl,
            zone: Some(zone),
        })
    }

    /// Create an alias for a host.
    pub fn create_cname(&mut self, new: NewCname) -> Result<Applied<Cname>> {
        let mut cname = self.check_cname(&new, None)?;
        cname.id = self.allocate();

        self.index.cname_names.insert(cname.name.clone(), cname.id);
        self.cnames.insert(cname.id, cname.clone());
        self.saved(&cname);
        tracing::info!(alias = %cname.name, "cname created");

        let mut affected = AffectedZones::new();
        affected.insert_opt(cname.zone);
        Ok(self.commit(cname, affected))
    }

    /// Replace the alias `name` with `new`.
    pub fn update_cname(&mut self, name: &str, new: NewCname) -> Result<Applied<Cname>> {
        let current = self.cname(name)?.clone();
        let mut cname = self.check_cname(&new, Some(&current.name))?;
        cname.id = current.id;

        self.index.cname_names.remove(&current.name);
        self.index.cname_names.insert(cname.name.clone(), cname.id);
        self.cnames.insert(cname.id, cname.clone());
        self.saved(&cname);

        let mut affected = AffectedZones::new();
        affected.extend([current.zone, cname.zone]);
        Ok(self.commit(cname, affected))
    }

    pub fn delete_cname(&mut self, name: &str) -> Result<Applied<Cname>> {
        let cname = self.cname(name)?.clone();
        self.cnames.remove(&cname.id);
        self.index.cname_names.remove(&cname.name);
        self.deleted(&cname);
        tracing::info!(alias = %cname.name, "cname deleted");

        let mut affected = AffectedZones::new();
        affected.insert_opt(cname.zone);
        Ok(self.commit(cname, affected))
    }

    // ----- srv ----------------------------------------------------------

    fn check_srv(&self, new: &NewSrv) -> Result<Srv> {
        let name = validate::srv_name("name", &new.name)?;
        let zone = self.managed_zone_for("name", &name)?;
        let host = self.host(&new.host)?.id;
        self.check_ttl("ttl", new.ttl)?;
        Ok(Srv {
            id: SrvId(0),
            name,
            priority: new.priority,
            weight: new.weight,
            port: new.port,
            ttl: new.ttl,
            host,
            zone: Some(zone),
        })
    }

    pub fn create_srv(&mut self, new: NewSrv) -> Result<Applied<Srv>> {
        let mut srv = self.check_srv(&new)?;
        srv.id = self.allocate();

        self.srvs.insert(srv.id, srv.clone());
        self.saved(&srv);
        tracing::info!(name = %srv.name, port = srv.port, "srv created");

        let mut affected = AffectedZones::new();
        affected.insert_opt(srv.zone);
        Ok(self.commit(srv, affected))
    }

    pub fn update_srv(&mut self, id: SrvId, new: NewSrv) -> Result<Applied<Srv>> {
        let current = self.srv(id)?.clone();
        let mut srv = self.check_srv(&new)?;
        srv.id = id;

        self.srvs.insert(id, srv.clone());
        self.saved(&srv);

        let mut affected = AffectedZones::new();
        affected.extend([current.zone, srv.zone]);
        Ok(self.commit(srv, affected))
    }

    pub fn delete_srv(&mut self, id: SrvId) -> Result<Applied<Srv>> {
        let srv = self.srv(id)?.clone();
        self.srvs.remove(&id);
        self.deleted(&srv);

        let mut affected = AffectedZones::new();
        affected.insert_opt(srv.zone);
        Ok(self.commit(srv, affected))
    }

    // ----- hinfo presets ------------------------------------------------

    /// Register a cpu/os pair. Pairs are unique.
    pub fn create_hinfo_preset(&mut self, new: NewHinfoPreset) -> Result<HinfoPreset> {
        let cpu = validate::non_empty("cpu", &new.cpu)?;
        let os = validate::non_empty("os", &new.os)?;
        if self
            .hinfo_presets
            .values()
            .any(|p| p.cpu == cpu && p.os == os)
        {
            return Err(RegistryError::Conflict(format!(
                "hinfo preset {cpu}/{os} already exists"
            )));
        }

        let preset = HinfoPreset {
            id: self.allocate(),
            cpu,
            os,
        };
        self.hinfo_presets.insert(preset.id, preset.clone());
        self.saved(&preset);
        Ok(preset)
    }

    /// Delete a preset no host refers to.
    pub fn delete_hinfo_preset(&mut self, id: HinfoPresetId) -> Result<HinfoPreset> {
        let preset = self.hinfo_preset(id)?.clone();
        let users = self.hosts.values().filter(|h| h.hinfo == Some(id)).count();
        if users > 0 {
            return Err(RegistryError::Conflict(format!(
                "hinfo preset {id} is used by {users} host(s)"
            )));
        }
        self.hinfo_presets.remove(&id);
        self.deleted(&preset);
        Ok(preset)
    }
}

#[cfg(test)]
mod tests {
    use crate::inventory::testing;
    use zonereg_core::{
        ErrorKind, HostPatch, Mx, NewCname, NewHinfoPreset, NewHost, NewMx, NewNaptr, NewSrv,
        NewSshfp, NewTxt, Txt,
    };

    fn cname(name: &str, host: &str) -> NewCname {
        NewCname {
            name: name.into(),
            host: host.into(),
            ttl: None,
        }
    }

    #[test]
    fn test_record_marks_host_zone() {
        let (mut inv, _) = testing::inventory();
        let host = testing::host(&mut inv, "www.example.org", "10.0.0.10");
        testing::clean(&mut inv);

        let txt = inv
            .create_record::<Txt>(NewTxt {
                host: "www.example.org".into(),
                txt: "v=spf1 -all".into(),
            })
            .unwrap()
            .value;
        assert!(inv.zone("example.org").unwrap().updated);
        assert_eq!(inv.records_of::<Txt>(host.id).len(), 1);

        testing::clean(&mut inv);
        inv.delete_record::<Txt>(txt.id).unwrap();
        assert!(inv.zone("example.org").unwrap().updated);
        assert!(inv.records_of::<Txt>(host.id).is_empty());
    }

    #[test]
    fn test_record_validation() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "www.example.org", "10.0.0.10");

        let err = inv
            .create_record::<Txt>(NewTxt {
                host: "www.example.org".into(),
                txt: String::new(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = inv
            .create_record::<Mx>(NewMx {
                host: "nope.example.org".into(),
                priority: 10,
                mx: "mail.example.org".into(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = inv
            .create_record::<zonereg_core::Naptr>(NewNaptr {
                host: "www.example.org".into(),
                order: 10,
                preference: 10,
                flag: "x".into(),
                service: "SIP+D2U".into(),
                regex: String::new(),
                replacement: "_sip._udp.example.org".into(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let sshfp = inv
            .create_record::<zonereg_core::Sshfp>(NewSshfp {
                host: "www.example.org".into(),
                algorithm: 4,
                hash_type: 1,
                fingerprint: "0123456789ABCDEF0123456789ABCDEF01234567".into(),
            })
            .unwrap()
            .value;
        assert_eq!(sshfp.fingerprint, "0123456789abcdef0123456789abcdef01234567");
    }

    #[test]
    fn test_mx_render_order_and_update() {
        let (mut inv, _) = testing::inventory();
        let www = testing::host(&mut inv, "www.example.org", "10.0.0.10");
        let other = testing::host(&mut inv, "db.example.org", "10.0.0.11");
        let mx = |prio, name: &str| NewMx {
            host: "www.example.org".into(),
            priority: prio,
            mx: name.into(),
        };
        let second = inv.create_record::<Mx>(mx(20, "b.example.org")).unwrap().value;
        inv.create_record::<Mx>(mx(10, "a.example.org")).unwrap();

        let order: Vec<u16> = inv.records_of::<Mx>(www.id).iter().map(|m| m.priority).collect();
        assert_eq!(order, vec![10, 20]);

        let moved = inv
            .update_record::<Mx>(
                second.id,
                NewMx {
                    host: "db.example.org".into(),
                    priority: 5,
                    mx: "c.example.org".into(),
                },
            )
            .unwrap()
            .value;
        assert_eq!(moved.host, other.id);
        assert_eq!(inv.records_of::<Mx>(www.id).len(), 1);
    }

    #[test]
    fn test_cname_rules() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "www.example.org", "10.0.0.10");

        let err = inv
            .create_cname(cname("www.example.org", "www.example.org"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = inv
            .create_cname(cname("web.example.net", "www.example.org"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        inv.create_cname(cname("web.example.org", "www.example.org"))
            .unwrap();
        let err = inv
            .create_cname(cname("web.example.org", "www.example.org"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let renamed = inv
            .update_cname("web.example.org", cname("site.example.org", "www.example.org"))
            .unwrap()
            .value;
        assert_eq!(renamed.name, "site.example.org");
        assert!(inv.cname("web.example.org").is_err());
        inv.delete_cname("site.example.org").unwrap();
        assert!(inv.cname("site.example.org").is_err());
    }

    #[test]
    fn test_rename_marks_cname_zone() {
        let (mut inv, _) = testing::inventory();
        inv.create_zone(zonereg_core::NewZone::new(
            "example.com",
            ["ns1.example.org"],
            "hostmaster@example.org",
        ))
        .unwrap();
        testing::host(&mut inv, "www.example.org", "10.0.0.10");
        inv.create_cname(cname("www.example.com", "www.example.org"))
            .unwrap();
        testing::clean(&mut inv);

        inv.patch_host(
            "www.example.org",
            HostPatch {
                name: Some("web.example.org".into()),
                ..HostPatch::default()
            },
        )
        .unwrap();
        assert!(inv.zone("example.com").unwrap().updated);
    }

    #[test]
    fn test_srv_lifecycle() {
        let (mut inv, _) = testing::inventory();
        testing::host(&mut inv, "sip.example.org", "10.0.0.10");
        let new = NewSrv {
            name: "_sip._udp.example.org".into(),
            priority: 10,
            weight: 5,
            port: 5060,
            ttl: None,
            host: "sip.example.org".into(),
        };
        let srv = inv.create_srv(new.clone()).unwrap().value;
        assert!(srv.zone.is_some());

        let err = inv
            .create_srv(NewSrv {
                name: "sip._udp.example.org".into(),
                ..new.clone()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let updated = inv
            .update_srv(srv.id, NewSrv { port: 5061, ..new })
            .unwrap()
            .value;
        assert_eq!(updated.port, 5061);
        inv.delete_srv(srv.id).unwrap();
        assert!(inv.srv(srv.id).is_err());
    }

    #[test]
    fn test_hinfo_preset_in_use() {
        let (mut inv, _) = testing::inventory();
        let preset = inv
            .create_hinfo_preset(NewHinfoPreset {
                cpu: "x86_64".into(),
                os: "Linux".into(),
            })
            .unwrap();
        let err = inv
            .create_hinfo_preset(NewHinfoPreset {
                cpu: "x86_64".into(),
                os: "Linux".into(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        inv.create_host(NewHost {
            hinfo: Some(preset.id),
            ..NewHost::new("www.example.org", "ops@example.org")
        })
        .unwrap();
        let err = inv.delete_hinfo_preset(preset.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        inv.delete_host("www.example.org").unwrap();
        inv.delete_hinfo_preset(preset.id).unwrap();
    }
}
